//! Contract between data channels and the transport that carries them
//!
//! The provider owns the real SCTP association or RTP session. Channels only
//! hold a weak reference to it; the provider outlives every channel it serves.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// RTP synchronization source identifier
pub type Ssrc = u32;

static NEXT_CHANNEL_KEY: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one channel instance
///
/// Two channels that reuse the same stream id still have different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelKey(u64);

impl ChannelKey {
    pub(crate) fn next() -> Self {
        Self(NEXT_CHANNEL_KEY.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dc-{}", self.0)
    }
}

/// Kind of payload carried by one transport message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageType {
    /// Handshake message (OPEN / OPEN-ACK)
    Control,
    /// UTF-8 application data
    Text,
    /// Binary application data
    Binary,
}

impl MessageType {
    pub fn for_buffer(binary: bool) -> Self {
        if binary {
            MessageType::Binary
        } else {
            MessageType::Text
        }
    }
}

/// Per-message parameters handed to [`DataChannelProvider::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendParams {
    /// SCTP stream id or RTP send ssrc
    pub id: u32,
    pub message_type: MessageType,
    pub ordered: bool,
    pub max_retransmits: Option<u16>,
    pub max_retransmit_time: Option<Duration>,
}

/// Per-message parameters of inbound data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveParams {
    /// SCTP stream id or RTP ssrc the message arrived on
    pub id: u32,
    pub message_type: MessageType,
}

impl ReceiveParams {
    /// Application data on `id`
    pub fn data(id: u32, binary: bool) -> Self {
        Self {
            id,
            message_type: MessageType::for_buffer(binary),
        }
    }

    /// Control message on `id`
    pub fn control(id: u32) -> Self {
        Self {
            id,
            message_type: MessageType::Control,
        }
    }
}

/// Outcome of a transport send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Handed to the transport
    Success,
    /// Transport buffers are full; retry after the next ready-to-send signal
    Blocked,
    /// Unrecoverable failure
    Error,
}

/// The transport underneath a set of data channels
///
/// All methods are called from the channels' owning context. Implementations
/// must not call back into the calling channel synchronously.
pub trait DataChannelProvider: Send + Sync {
    /// Register a channel for transport events. Returns false if the
    /// transport does not exist yet.
    fn connect_data_channel(&self, channel: ChannelKey) -> bool;

    /// Unregister a channel
    fn disconnect_data_channel(&self, channel: ChannelKey);

    /// Open an SCTP stream
    fn add_stream(&self, id: crate::StreamId);

    /// Reset an SCTP stream
    fn remove_stream(&self, id: crate::StreamId);

    /// True once the transport can accept data
    fn ready_to_send(&self) -> bool;

    /// Hand one message to the transport
    fn send(&self, params: &SendParams, payload: &Bytes) -> SendResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_keys_are_unique() {
        let a = ChannelKey::next();
        let b = ChannelKey::next();
        assert_ne!(a, b);
        assert!(b > a);
        assert_eq!(a.to_string(), format!("dc-{}", a.as_u64()));
    }

    #[test]
    fn test_receive_params_constructors() {
        assert_eq!(ReceiveParams::data(3, true).message_type, MessageType::Binary);
        assert_eq!(ReceiveParams::data(3, false).message_type, MessageType::Text);
        assert_eq!(ReceiveParams::control(5).message_type, MessageType::Control);
    }
}
