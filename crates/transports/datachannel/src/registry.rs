//! Channel registry
//!
//! Owns every channel of one session, hands out SCTP stream ids, routes
//! transport events to the channels they concern and runs the deferred
//! tasks channels post to their execution context.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channels::{ChannelState, ControlMessage, DataChannel};
use crate::config::{ChannelConfig, ChannelInit, RegistryConfig, StreamId, TransportKind};
use crate::context::{ChannelTask, TaskQueue};
use crate::provider::{ChannelKey, DataChannelProvider, MessageType, ReceiveParams, Ssrc};
use crate::{Error, Result};

/// DTLS role of the local side, which decides stream id parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DtlsRole {
    /// Allocates even stream ids
    Client,
    /// Allocates odd stream ids
    Server,
}

impl DtlsRole {
    fn first_sid(self) -> StreamId {
        match self {
            DtlsRole::Client => 0,
            DtlsRole::Server => 1,
        }
    }
}

/// One RTP data stream announced in a session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtpStream {
    /// Channel label; empty means the channel is named after its ssrc
    pub label: String,
    pub ssrc: Ssrc,
}

impl RtpStream {
    pub fn new(label: impl Into<String>, ssrc: Ssrc) -> Self {
        Self {
            label: label.into(),
            ssrc,
        }
    }

    fn channel_label(&self) -> String {
        if self.label.is_empty() {
            self.ssrc.to_string()
        } else {
            self.label.clone()
        }
    }
}

/// Manages all data channels sharing one transport
pub struct ChannelRegistry {
    /// Channels by key
    channels: HashMap<ChannelKey, DataChannel>,

    /// Transport shared by every channel
    provider: Arc<dyn DataChannelProvider>,

    config: RegistryConfig,

    /// Execution context for deferred channel work
    tasks: TaskQueue,

    /// SCTP stream ids currently reserved
    used_sids: BTreeSet<StreamId>,

    /// Known once the DTLS handshake picked a role
    dtls_role: Option<DtlsRole>,

    /// Channels opened by the remote peer and not yet reported
    new_remote_channels: Vec<ChannelKey>,
}

impl ChannelRegistry {
    /// Create a registry on top of `provider`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(provider: Arc<dyn DataChannelProvider>, config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            channels: HashMap::new(),
            provider,
            config,
            tasks: TaskQueue::new(),
            used_sids: BTreeSet::new(),
            dtls_role: None,
            new_remote_channels: Vec::new(),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn dtls_role(&self) -> Option<DtlsRole> {
        self.dtls_role
    }

    /// Number of registered channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Keys of all registered channels in creation order
    pub fn keys(&self) -> Vec<ChannelKey> {
        let mut keys: Vec<ChannelKey> = self.channels.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn channel(&self, key: ChannelKey) -> Option<&DataChannel> {
        self.channels.get(&key)
    }

    pub fn channel_mut(&mut self, key: ChannelKey) -> Option<&mut DataChannel> {
        self.channels.get_mut(&key)
    }

    /// SCTP channel using stream `sid`
    pub fn find_by_sid(&self, sid: StreamId) -> Option<ChannelKey> {
        self.channels
            .values()
            .find(|channel| channel.id() == Some(sid))
            .map(DataChannel::key)
    }

    /// First channel (in creation order) with this label
    pub fn find_by_label(&self, label: &str) -> Option<ChannelKey> {
        self.keys()
            .into_iter()
            .find(|key| self.channels[key].label() == label)
    }

    /// Create and register a local channel
    ///
    /// SCTP channels without an id get one right away if the DTLS role is
    /// already known, otherwise when [`Self::on_dtls_role_ready`] runs.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] for an invalid `init` or a stream id in use
    /// - [`Error::DuplicateLabel`] for a second live RTP channel with `label`
    /// - [`Error::StreamIdExhausted`] if no id of the local parity is free
    pub fn create_channel(
        &mut self,
        kind: TransportKind,
        label: &str,
        mut init: ChannelInit,
    ) -> Result<ChannelKey> {
        init.validate(kind)?;

        let mut reserved = None;
        match kind {
            TransportKind::Rtp => {
                let duplicate = self.channels.values().any(|channel| {
                    channel.kind() == TransportKind::Rtp
                        && channel.label() == label
                        && channel.state() != ChannelState::Closed
                });
                if duplicate {
                    return Err(Error::DuplicateLabel(label.to_string()));
                }
            }
            TransportKind::Sctp => match init.id {
                Some(sid) => {
                    if !self.used_sids.insert(sid) {
                        return Err(Error::InvalidConfig(format!(
                            "stream id {} is already in use",
                            sid
                        )));
                    }
                    reserved = Some(sid);
                }
                None => {
                    if let Some(role) = self.dtls_role {
                        let sid = self.allocate_sctp_sid(role)?;
                        init.id = Some(sid);
                        reserved = Some(sid);
                    }
                }
            },
        }

        let channel = match DataChannel::create(
            &self.provider,
            kind,
            label,
            init,
            &self.tasks.sender(),
        ) {
            Ok(channel) => channel,
            Err(e) => {
                if let Some(sid) = reserved {
                    self.release_sid(sid);
                }
                return Err(e);
            }
        };

        let key = channel.key();
        info!(key = %key, label = %label, sid = ?reserved, "Adding data channel to registry");
        self.channels.insert(key, channel);

        Ok(key)
    }

    /// Reserve the lowest free stream id of `role`'s parity
    ///
    /// # Errors
    ///
    /// Returns [`Error::StreamIdExhausted`] when every id up to
    /// `max_sctp_sid` of that parity is in use.
    pub fn allocate_sctp_sid(&mut self, role: DtlsRole) -> Result<StreamId> {
        let mut sid = role.first_sid();
        while sid <= self.config.max_sctp_sid {
            if self.used_sids.insert(sid) {
                debug!(sid, role = ?role, "Allocated SCTP stream id");
                return Ok(sid);
            }
            sid += 2;
        }

        Err(Error::StreamIdExhausted)
    }

    /// Make `sid` available again
    pub fn release_sid(&mut self, sid: StreamId) {
        if self.used_sids.remove(&sid) {
            debug!(sid, "Released SCTP stream id");
        }
    }

    /// True if `sid` is reserved
    pub fn is_sid_in_use(&self, sid: StreamId) -> bool {
        self.used_sids.contains(&sid)
    }

    /// The DTLS role is known; assign ids to channels still waiting for one
    ///
    /// A channel for which no id is left is closed.
    pub fn on_dtls_role_ready(&mut self, role: DtlsRole) {
        info!(role = ?role, "DTLS role ready for SCTP");
        self.dtls_role = Some(role);

        for key in self.keys() {
            let waiting = self.channels.get(&key).is_some_and(|channel| {
                channel.kind() == TransportKind::Sctp
                    && channel.id().is_none()
                    && channel.state() != ChannelState::Closed
            });
            if !waiting {
                continue;
            }

            let allocated = self.allocate_sctp_sid(role);
            let Some(channel) = self.channels.get_mut(&key) else {
                continue;
            };
            match allocated {
                Ok(sid) => channel.set_sctp_stream_id(sid),
                Err(e) => {
                    error!(label = %channel.label(), "Failed to allocate SCTP sid: {}", e);
                    channel.close();
                }
            }
        }

        self.maybe_prune();
    }

    /// Route one inbound transport message
    ///
    /// An OPEN on a stream id no channel uses creates a remote channel that
    /// answers with OPEN-ACK.
    pub fn on_data_received(&mut self, params: &ReceiveParams, payload: Bytes) {
        let targets: Vec<ChannelKey> = self
            .channels
            .values()
            .filter(|channel| match channel.kind() {
                TransportKind::Sctp => channel.id().map(u32::from) == Some(params.id),
                TransportKind::Rtp => channel.receive_ssrc() == Some(params.id),
            })
            .map(DataChannel::key)
            .collect();

        if targets.is_empty() {
            if params.message_type == MessageType::Control {
                self.on_open_message(params.id, &payload);
            } else {
                debug!(id = params.id, "Dropping data for unknown channel");
            }
            return;
        }

        for key in targets {
            if let Some(channel) = self.channels.get_mut(&key) {
                channel.on_data_received(params, payload.clone());
            }
        }

        self.maybe_prune();
    }

    fn on_open_message(&mut self, id: u32, payload: &[u8]) {
        let open = match ControlMessage::parse(payload) {
            Ok(ControlMessage::Open(open)) => open,
            Ok(ControlMessage::OpenAck) => {
                warn!(sid = id, "OPEN_ACK for unknown data channel");
                return;
            }
            Err(e) => {
                warn!(sid = id, "Failed to parse OPEN message: {}", e);
                return;
            }
        };

        if !self.config.accept_remote_channels {
            warn!(sid = id, label = %open.label, "Rejecting remotely opened data channel");
            return;
        }

        let sid = match StreamId::try_from(id) {
            Ok(sid) if sid <= self.config.max_sctp_sid => sid,
            _ => {
                warn!(sid = id, "OPEN message on out of range stream id");
                return;
            }
        };

        match self.create_channel(TransportKind::Sctp, &open.label, open.to_init(sid)) {
            Ok(key) => {
                info!(sid, label = %open.label, "Created data channel from OPEN message");
                self.new_remote_channels.push(key);
            }
            Err(e) => {
                error!(sid, "Failed to create DataChannel from the OPEN message: {}", e);
            }
        }
    }

    /// Channels opened by the remote peer since the last call
    pub fn take_new_remote_channels(&mut self) -> Vec<ChannelKey> {
        std::mem::take(&mut self.new_remote_channels)
    }

    /// The transport's writability changed
    pub fn on_ready_to_send(&mut self, writable: bool) {
        for key in self.keys() {
            if let Some(channel) = self.channels.get_mut(&key) {
                channel.on_channel_ready(writable);
            }
        }

        self.maybe_prune();
    }

    /// The transport now exists
    pub fn on_transport_created(&mut self) {
        for key in self.keys() {
            if let Some(channel) = self.channels.get_mut(&key) {
                channel.on_transport_channel_created();
            }
        }
    }

    /// The remote peer reset stream `sid`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] if no channel uses `sid`.
    pub fn on_remote_stream_closed(&mut self, sid: StreamId) -> Result<()> {
        let key = self
            .find_by_sid(sid)
            .ok_or_else(|| Error::ChannelNotFound(format!("sid {}", sid)))?;

        if let Some(channel) = self.channels.get_mut(&key) {
            info!(sid, label = %channel.label(), "Remote peer closed data channel");
            channel.remote_peer_request_close();
        }

        self.maybe_prune();
        Ok(())
    }

    /// The transport shut down; close every channel
    pub fn on_transport_closed(&mut self) {
        info!(channels = self.channels.len(), "Data transport closed");
        for key in self.keys() {
            if let Some(channel) = self.channels.get_mut(&key) {
                channel.on_transport_engine_close();
            }
        }

        self.maybe_prune();
    }

    /// Wire the ssrcs of the RTP channel labelled `label`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelNotFound`] if no live RTP channel has `label`.
    pub fn set_rtp_ssrcs(
        &mut self,
        label: &str,
        send_ssrc: Option<Ssrc>,
        receive_ssrc: Option<Ssrc>,
    ) -> Result<()> {
        let channel = self
            .find_live_rtp(label)
            .and_then(|key| self.channels.get_mut(&key))
            .ok_or_else(|| Error::ChannelNotFound(label.to_string()))?;

        if let Some(ssrc) = send_ssrc {
            channel.set_send_ssrc(ssrc);
        }
        if let Some(ssrc) = receive_ssrc {
            channel.set_receive_ssrc(ssrc);
        }

        Ok(())
    }

    /// Apply the RTP data streams of the local description
    ///
    /// Listed channels get their send ssrc. Live RTP channels missing from
    /// the list stop sending.
    pub fn update_local_rtp_channels(&mut self, streams: &[RtpStream]) {
        let mut active = Vec::with_capacity(streams.len());
        for stream in streams {
            let label = stream.channel_label();
            let Some(channel) = self
                .find_live_rtp(&label)
                .and_then(|key| self.channels.get_mut(&key))
            else {
                warn!(label = %label, ssrc = stream.ssrc, "Local RTP stream for unknown data channel");
                continue;
            };

            channel.set_send_ssrc(stream.ssrc);
            active.push(label);
        }

        self.update_closing_rtp_channels(&active, true);
    }

    /// Apply the RTP data streams of the remote description
    ///
    /// Known channels get their receive ssrc, unknown labels create remote
    /// channels, and live RTP channels missing from the list are closed.
    pub fn update_remote_rtp_channels(&mut self, streams: &[RtpStream]) {
        let mut active = Vec::with_capacity(streams.len());
        for stream in streams {
            let label = stream.channel_label();
            match self.find_live_rtp(&label) {
                Some(key) => {
                    if let Some(channel) = self.channels.get_mut(&key) {
                        channel.set_receive_ssrc(stream.ssrc);
                    }
                }
                None => self.create_remote_rtp_channel(&label, stream.ssrc),
            }
            active.push(label);
        }

        self.update_closing_rtp_channels(&active, false);
    }

    fn create_remote_rtp_channel(&mut self, label: &str, ssrc: Ssrc) {
        if !self.config.accept_remote_channels {
            warn!(label = %label, ssrc, "Rejecting remote RTP data channel");
            return;
        }

        let init = ChannelInit::new(ChannelConfig::reliable());
        match self.create_channel(TransportKind::Rtp, label, init) {
            Ok(key) => {
                if let Some(channel) = self.channels.get_mut(&key) {
                    channel.set_receive_ssrc(ssrc);
                }
                info!(label = %label, ssrc, "Created remote RTP data channel");
                self.new_remote_channels.push(key);
            }
            Err(e) => {
                warn!(label = %label, "Remote peer requested a data channel but creation failed: {}", e);
            }
        }
    }

    fn update_closing_rtp_channels(&mut self, active: &[String], is_local_update: bool) {
        for key in self.keys() {
            let Some(channel) = self.channels.get_mut(&key) else {
                continue;
            };
            if channel.kind() != TransportKind::Rtp
                || channel.state() == ChannelState::Closed
                || active.iter().any(|label| label == channel.label())
            {
                continue;
            }

            if is_local_update {
                channel.reset_send_ssrc();
            } else {
                debug!(label = %channel.label(), "RTP data channel left the remote description");
                channel.remote_peer_request_close();
            }
        }

        self.maybe_prune();
    }

    fn find_live_rtp(&self, label: &str) -> Option<ChannelKey> {
        self.channels
            .values()
            .find(|channel| {
                channel.kind() == TransportKind::Rtp
                    && channel.label() == label
                    && channel.state() != ChannelState::Closed
            })
            .map(DataChannel::key)
    }

    /// Drop closed channels and release their stream ids
    pub fn prune_closed(&mut self) -> Vec<ChannelKey> {
        let closed: Vec<ChannelKey> = self
            .channels
            .values()
            .filter(|channel| channel.state() == ChannelState::Closed)
            .map(DataChannel::key)
            .collect();

        for key in &closed {
            if let Some(channel) = self.channels.remove(key) {
                info!(key = %key, label = %channel.label(), "Removing closed data channel");
                if let Some(sid) = channel.id() {
                    self.release_sid(sid);
                }
            }
        }

        closed
    }

    fn maybe_prune(&mut self) {
        if self.config.prune_closed_channels {
            self.prune_closed();
        }
    }

    /// Run every task already posted. Returns the number of tasks taken.
    pub fn run_pending_tasks(&mut self) -> usize {
        let mut count = 0;
        while let Some(task) = self.tasks.try_next() {
            self.dispatch(task);
            count += 1;
        }

        if count > 0 {
            self.maybe_prune();
        }
        count
    }

    /// Run posted tasks as they arrive until `shutdown` is cancelled
    pub async fn run(&mut self, shutdown: CancellationToken) {
        debug!("Channel registry task loop started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                task = self.tasks.next() => match task {
                    Some(task) => {
                        self.dispatch(task);
                        self.maybe_prune();
                    }
                    None => break,
                },
            }
        }
        debug!("Channel registry task loop stopped");
    }

    fn dispatch(&mut self, task: ChannelTask) {
        match self.channels.get_mut(&task.key()) {
            Some(channel) => channel.run_task(task),
            None => debug!(key = %task.key(), "Dropping task for removed channel"),
        }
    }
}

impl std::fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelRegistry")
            .field("channels", &self.channels.len())
            .field("used_sids", &self.used_sids)
            .field("dtls_role", &self.dtls_role)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::provider::{SendParams, SendResult};

    struct IdleProvider;

    impl DataChannelProvider for IdleProvider {
        fn connect_data_channel(&self, _channel: ChannelKey) -> bool {
            true
        }
        fn disconnect_data_channel(&self, _channel: ChannelKey) {}
        fn add_stream(&self, _id: StreamId) {}
        fn remove_stream(&self, _id: StreamId) {}
        fn ready_to_send(&self) -> bool {
            false
        }
        fn send(&self, _params: &SendParams, _payload: &Bytes) -> SendResult {
            SendResult::Success
        }
    }

    fn reliable_init() -> ChannelInit {
        ChannelInit::new(ChannelConfig::reliable())
    }

    fn registry(config: RegistryConfig) -> ChannelRegistry {
        ChannelRegistry::new(Arc::new(IdleProvider), config).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RegistryConfig {
            max_sctp_sid: 4096,
            ..Default::default()
        };
        assert!(ChannelRegistry::new(Arc::new(IdleProvider), config).is_err());
    }

    #[test]
    fn test_sid_parity_follows_dtls_role() {
        let mut reg = registry(RegistryConfig::default());

        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Client).unwrap(), 0);
        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Client).unwrap(), 2);
        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Server).unwrap(), 1);
        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Server).unwrap(), 3);
    }

    #[test]
    fn test_sid_allocation_skips_used_and_reuses_released() {
        let mut reg = registry(RegistryConfig::default());
        reg.create_channel(
            TransportKind::Sctp,
            "fixed",
            ChannelInit::new(ChannelConfig::reliable()).with_id(0),
        )
        .unwrap();

        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Client).unwrap(), 2);
        reg.release_sid(2);
        assert!(!reg.is_sid_in_use(2));
        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Client).unwrap(), 2);
    }

    #[test]
    fn test_sid_exhaustion() {
        let mut reg = registry(RegistryConfig {
            max_sctp_sid: 3,
            ..Default::default()
        });

        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Server).unwrap(), 1);
        assert_eq!(reg.allocate_sctp_sid(DtlsRole::Server).unwrap(), 3);
        assert!(matches!(
            reg.allocate_sctp_sid(DtlsRole::Server),
            Err(Error::StreamIdExhausted)
        ));
    }

    #[test]
    fn test_duplicate_sid_is_rejected() {
        let mut reg = registry(RegistryConfig::default());
        let init = ChannelInit::new(ChannelConfig::reliable()).with_id(6);
        reg.create_channel(TransportKind::Sctp, "a", init.clone()).unwrap();

        let err = reg.create_channel(TransportKind::Sctp, "b", init).unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_rtp_labels_must_be_unique() {
        let mut reg = registry(RegistryConfig::default());
        let init = ChannelInit::new(ChannelConfig::reliable());
        reg.create_channel(TransportKind::Rtp, "legacy", init.clone()).unwrap();

        let err = reg.create_channel(TransportKind::Rtp, "legacy", init).unwrap_err();
        assert!(matches!(err, Error::DuplicateLabel(_)));
    }

    #[test]
    fn test_invalid_init_does_not_leak_sid() {
        let mut reg = registry(RegistryConfig::default());
        reg.on_dtls_role_ready(DtlsRole::Client);

        let mut config = ChannelConfig::partial_reliable_rexmit(1);
        config.max_retransmit_time = Some(std::time::Duration::from_millis(10));
        assert!(reg
            .create_channel(TransportKind::Sctp, "bad", ChannelInit::new(config))
            .is_err());
        assert!(!reg.is_sid_in_use(0));
    }

    #[test]
    fn test_dtls_role_assigns_waiting_channels_in_creation_order() {
        let mut reg = registry(RegistryConfig::default());
        let first = reg
            .create_channel(TransportKind::Sctp, "first", reliable_init())
            .unwrap();
        let second = reg
            .create_channel(TransportKind::Sctp, "second", reliable_init())
            .unwrap();
        assert_eq!(reg.channel(first).unwrap().id(), None);

        reg.on_dtls_role_ready(DtlsRole::Server);

        assert_eq!(reg.channel(first).unwrap().id(), Some(1));
        assert_eq!(reg.channel(second).unwrap().id(), Some(3));
        assert_eq!(reg.find_by_sid(3), Some(second));
        assert_eq!(reg.find_by_label("first"), Some(first));
    }

    #[test]
    fn test_unknown_stream_close_is_not_found() {
        let mut reg = registry(RegistryConfig::default());
        assert!(matches!(
            reg.on_remote_stream_closed(9),
            Err(Error::ChannelNotFound(_))
        ));
    }
}
