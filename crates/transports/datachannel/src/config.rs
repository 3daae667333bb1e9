//! Configuration types for data channels and the channel registry

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Error, Result};

/// SCTP stream identifier of a channel
pub type StreamId = u16;

/// Highest SCTP stream id handed out or accepted
pub const MAX_SCTP_SID: StreamId = 1023;

/// Maximum bytes buffered on the send side before the channel refuses more (16 MB)
pub const MAX_QUEUED_SEND_BYTES: usize = 16 * 1024 * 1024;

/// Maximum bytes buffered on the receive side while no observer consumes them (16 MB)
pub const MAX_QUEUED_RECEIVE_BYTES: usize = 16 * 1024 * 1024;

/// Longest label or protocol an OPEN message can carry (u16 length field)
pub const MAX_LABEL_BYTES: usize = u16::MAX as usize;

/// Transport binding a channel runs over. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Legacy RTP-backed data: ssrc addressing, no handshake, no reliability knobs
    Rtp,
    /// SCTP-backed data: stream ids, OPEN/OPEN-ACK handshake, partial reliability
    Sctp,
}

/// Which side of the OPEN/OPEN-ACK exchange this channel plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenHandshakeRole {
    /// Stream id agreed out-of-band by both peers; no handshake
    PreNegotiated,
    /// Local side creates the channel and sends OPEN
    #[default]
    Opener,
    /// Remote side sent OPEN; local side answers with OPEN-ACK
    Acker,
}

/// Delivery configuration of a single channel
///
/// At most one of `max_retransmits` / `max_retransmit_time` may be set.
/// With neither set the channel is fully reliable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Deliver messages in the order they were sent (default: true)
    pub ordered: bool,

    /// Give up on a message after this many retransmissions
    pub max_retransmits: Option<u16>,

    /// Give up on a message after this much time
    pub max_retransmit_time: Option<Duration>,

    /// Channel was negotiated by the application; no in-band handshake
    pub negotiated: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::reliable()
    }
}

impl ChannelConfig {
    /// Reliable, ordered delivery
    pub fn reliable() -> Self {
        Self {
            ordered: true,
            max_retransmits: None,
            max_retransmit_time: None,
            negotiated: false,
        }
    }

    /// Unordered delivery with no retransmissions (lowest latency)
    pub fn unreliable() -> Self {
        Self {
            ordered: false,
            max_retransmits: Some(0),
            max_retransmit_time: None,
            negotiated: false,
        }
    }

    /// Partially reliable: at most `max_retransmits` retransmissions per message
    pub fn partial_reliable_rexmit(max_retransmits: u16) -> Self {
        Self {
            max_retransmits: Some(max_retransmits),
            ..Self::reliable()
        }
    }

    /// Partially reliable: retransmit for at most `lifetime` per message
    pub fn partial_reliable_timed(lifetime: Duration) -> Self {
        Self {
            max_retransmit_time: Some(lifetime),
            ..Self::reliable()
        }
    }

    /// Set ordered delivery
    pub fn with_ordered(mut self, ordered: bool) -> Self {
        self.ordered = ordered;
        self
    }

    /// Mark the channel as negotiated out-of-band
    pub fn with_negotiated(mut self, negotiated: bool) -> Self {
        self.negotiated = negotiated;
        self
    }

    /// True when neither partial-reliability knob is set
    pub fn is_reliable(&self) -> bool {
        self.max_retransmits.is_none() && self.max_retransmit_time.is_none()
    }
}

/// Everything needed to create a channel besides its label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInit {
    /// Delivery configuration
    pub config: ChannelConfig,

    /// Application sub-protocol name (opaque)
    pub protocol: String,

    /// Stream id, when known at creation
    pub id: Option<StreamId>,

    /// Handshake role
    pub role: OpenHandshakeRole,
}

impl ChannelInit {
    /// Build an init from a config. Negotiated channels skip the handshake,
    /// everything else opens in-band.
    pub fn new(config: ChannelConfig) -> Self {
        let role = if config.negotiated {
            OpenHandshakeRole::PreNegotiated
        } else {
            OpenHandshakeRole::Opener
        };

        Self {
            config,
            protocol: String::new(),
            id: None,
            role,
        }
    }

    /// Set the sub-protocol
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// Set the stream id
    pub fn with_id(mut self, id: StreamId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the handshake role
    pub fn with_role(mut self, role: OpenHandshakeRole) -> Self {
        self.role = role;
        self
    }

    /// Validate this init for the given transport
    ///
    /// # Errors
    ///
    /// RTP channels reject `negotiated`, a preset id, and either
    /// retransmit knob. SCTP channels reject both retransmit knobs at once,
    /// a protocol longer than [`MAX_LABEL_BYTES`], ids above
    /// [`MAX_SCTP_SID`], negotiated channels that would still run a
    /// handshake, and pre-negotiated channels without an id.
    pub fn validate(&self, kind: TransportKind) -> Result<()> {
        match kind {
            TransportKind::Rtp => {
                if self.config.negotiated
                    || self.id.is_some()
                    || self.config.max_retransmits.is_some()
                    || self.config.max_retransmit_time.is_some()
                {
                    return Err(Error::InvalidConfig(
                        "RTP data channels support neither negotiated ids nor partial reliability"
                            .to_string(),
                    ));
                }
            }
            TransportKind::Sctp => {
                if self.config.max_retransmits.is_some() && self.config.max_retransmit_time.is_some()
                {
                    return Err(Error::InvalidConfig(
                        "max_retransmits and max_retransmit_time must not both be set".to_string(),
                    ));
                }

                if self.protocol.len() > MAX_LABEL_BYTES {
                    return Err(Error::InvalidConfig(format!(
                        "protocol must be at most {} bytes, got {}",
                        MAX_LABEL_BYTES,
                        self.protocol.len()
                    )));
                }

                if let Some(id) = self.id {
                    if id > MAX_SCTP_SID {
                        return Err(Error::InvalidConfig(format!(
                            "stream id must be in range 0-{}, got {}",
                            MAX_SCTP_SID, id
                        )));
                    }
                }

                if self.config.negotiated && self.role != OpenHandshakeRole::PreNegotiated {
                    return Err(Error::InvalidConfig(format!(
                        "negotiated channel cannot take the {:?} handshake role",
                        self.role
                    )));
                }

                if self.role == OpenHandshakeRole::PreNegotiated && self.id.is_none() {
                    return Err(Error::InvalidConfig(
                        "pre-negotiated channel requires a stream id".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Configuration of a [`crate::ChannelRegistry`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Highest stream id the registry allocates (default: 1023)
    pub max_sctp_sid: StreamId,

    /// Create channels for OPEN messages from the remote peer (default: true)
    pub accept_remote_channels: bool,

    /// Drop closed channels from the registry automatically (default: true)
    pub prune_closed_channels: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_sctp_sid: MAX_SCTP_SID,
            accept_remote_channels: true,
            prune_closed_channels: true,
        }
    }
}

impl RegistryConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if `max_sctp_sid` exceeds [`MAX_SCTP_SID`].
    pub fn validate(&self) -> Result<()> {
        if self.max_sctp_sid > MAX_SCTP_SID {
            return Err(Error::InvalidConfig(format!(
                "max_sctp_sid must be at most {}, got {}",
                MAX_SCTP_SID, self.max_sctp_sid
            )));
        }

        Ok(())
    }

    /// Refuse OPEN messages from the remote peer
    pub fn without_remote_channels(mut self) -> Self {
        self.accept_remote_channels = false;
        self
    }

    /// Keep closed channels registered until [`crate::ChannelRegistry::prune_closed`] runs
    pub fn keep_closed_channels(mut self) -> Self {
        self.prune_closed_channels = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_reliable_and_ordered() {
        let config = ChannelConfig::default();
        assert!(config.ordered);
        assert!(config.is_reliable());
        assert!(!config.negotiated);
    }

    #[test]
    fn test_unreliable_preset() {
        let config = ChannelConfig::unreliable();
        assert!(!config.ordered);
        assert_eq!(config.max_retransmits, Some(0));
        assert!(!config.is_reliable());
    }

    #[test]
    fn test_init_role_follows_negotiated() {
        assert_eq!(ChannelInit::new(ChannelConfig::reliable()).role, OpenHandshakeRole::Opener);

        let init = ChannelInit::new(ChannelConfig::reliable().with_negotiated(true));
        assert_eq!(init.role, OpenHandshakeRole::PreNegotiated);
    }

    #[test]
    fn test_rtp_rejects_sctp_only_settings() {
        assert!(ChannelInit::new(ChannelConfig::reliable())
            .validate(TransportKind::Rtp)
            .is_ok());

        let with_id = ChannelInit::new(ChannelConfig::reliable()).with_id(1);
        assert!(with_id.validate(TransportKind::Rtp).is_err());

        let rexmit = ChannelInit::new(ChannelConfig::partial_reliable_rexmit(3));
        assert!(rexmit.validate(TransportKind::Rtp).is_err());

        let negotiated = ChannelInit::new(ChannelConfig::reliable().with_negotiated(true));
        assert!(negotiated.validate(TransportKind::Rtp).is_err());
    }

    #[test]
    fn test_sctp_rejects_both_retransmit_knobs() {
        let mut config = ChannelConfig::partial_reliable_rexmit(2);
        config.max_retransmit_time = Some(Duration::from_millis(500));

        let err = ChannelInit::new(config).validate(TransportKind::Sctp).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_sctp_rejects_out_of_range_id() {
        let init = ChannelInit::new(ChannelConfig::reliable()).with_id(MAX_SCTP_SID + 1);
        assert!(init.validate(TransportKind::Sctp).is_err());

        let init = ChannelInit::new(ChannelConfig::reliable()).with_id(MAX_SCTP_SID);
        assert!(init.validate(TransportKind::Sctp).is_ok());
    }

    #[test]
    fn test_sctp_rejects_oversized_protocol() {
        let init = ChannelInit::new(ChannelConfig::reliable())
            .with_protocol("p".repeat(MAX_LABEL_BYTES + 1));
        assert!(init.validate(TransportKind::Sctp).is_err());

        let init = ChannelInit::new(ChannelConfig::reliable())
            .with_protocol("p".repeat(MAX_LABEL_BYTES));
        assert!(init.validate(TransportKind::Sctp).is_ok());
    }

    #[test]
    fn test_sctp_pre_negotiated_requires_id() {
        let init = ChannelInit::new(ChannelConfig::reliable().with_negotiated(true));
        assert!(init.validate(TransportKind::Sctp).is_err());
        assert!(init.with_id(4).validate(TransportKind::Sctp).is_ok());
    }

    #[test]
    fn test_sctp_negotiated_with_handshake_role_fails() {
        let init = ChannelInit::new(ChannelConfig::reliable().with_negotiated(true))
            .with_id(2)
            .with_role(OpenHandshakeRole::Opener);
        assert!(init.validate(TransportKind::Sctp).is_err());
    }

    #[test]
    fn test_registry_config_validation() {
        assert!(RegistryConfig::default().validate().is_ok());

        let config = RegistryConfig {
            max_sctp_sid: MAX_SCTP_SID + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let init = ChannelInit::new(ChannelConfig::partial_reliable_timed(Duration::from_secs(2)))
            .with_protocol("chat")
            .with_id(7);
        let json = serde_json::to_string(&init).unwrap();
        let deserialized: ChannelInit = serde_json::from_str(&json).unwrap();
        assert_eq!(init, deserialized);
    }

    #[test]
    fn test_registry_config_builders() {
        let config = RegistryConfig::default()
            .without_remote_channels()
            .keep_closed_channels();
        assert!(!config.accept_remote_channels);
        assert!(!config.prune_closed_channels);
    }
}
