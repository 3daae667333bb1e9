//! Per-channel state machine
//!
//! A [`DataChannel`] owns its outbound, inbound and control queues and its
//! handshake controller. Every mutation that can unblock a state transition
//! ends in `update_state()`, which re-evaluates the transition conditions
//! from scratch and is safe to call any number of times.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, trace, warn};

use super::handshake::{HandshakeController, HandshakeState, PendingControl};
use super::messages::{ControlMessage, DataBuffer, OpenMessage};
use super::queue::PacketQueue;
use crate::config::{
    ChannelConfig, ChannelInit, StreamId, TransportKind, MAX_LABEL_BYTES,
    MAX_QUEUED_RECEIVE_BYTES, MAX_QUEUED_SEND_BYTES,
};
use crate::context::{ChannelTask, TaskKind, TaskSender};
use crate::observer::DataChannelObserver;
use crate::provider::{
    ChannelKey, DataChannelProvider, MessageType, ReceiveParams, SendParams, SendResult, Ssrc,
};
use crate::{Error, Result};

/// Lifecycle state of a data channel
///
/// Only ever advances; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelState {
    /// Waiting for the transport and, for SCTP, the handshake
    Connecting,
    /// Application data may be sent
    Open,
    /// Draining queued data before releasing the transport
    Closing,
    /// Done; the instance is never reused
    Closed,
}

/// Message and byte counters of a channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Data messages accepted by the transport
    pub messages_sent: u64,
    /// Payload bytes accepted by the transport
    pub bytes_sent: u64,
    /// Data messages received for this channel
    pub messages_received: u64,
    /// Payload bytes received for this channel
    pub bytes_received: u64,
}

/// Transport-specific part of a channel
enum Binding {
    Rtp {
        send_ssrc: Option<Ssrc>,
        receive_ssrc: Option<Ssrc>,
    },
    Sctp {
        id: Option<StreamId>,
        handshake: HandshakeController,
    },
}

/// One logical data channel multiplexed over a shared transport
pub struct DataChannel {
    key: ChannelKey,
    label: String,
    protocol: String,
    config: ChannelConfig,
    binding: Binding,
    state: ChannelState,
    writable: bool,
    connected_to_provider: bool,
    outbound: PacketQueue,
    inbound: PacketQueue,
    control: PacketQueue,
    observer: Option<Box<dyn DataChannelObserver>>,
    provider: Weak<dyn DataChannelProvider>,
    stats: ChannelStats,
    // Cancels any task still pointing at this channel once it is dropped.
    _tasks_guard: DropGuard,
    tasks_token: CancellationToken,
}

impl DataChannel {
    /// Create a channel bound to `provider`
    ///
    /// For SCTP channels this immediately tries to attach to an existing
    /// transport. If the transport is already writable, a ChannelReady task
    /// is posted to `tasks` instead of being handled inline, so the caller
    /// can finish wiring the channel (observers, registry) first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `init` is not valid for `kind`,
    /// or if an SCTP label does not fit in an OPEN message.
    pub fn create(
        provider: &Arc<dyn DataChannelProvider>,
        kind: TransportKind,
        label: &str,
        init: ChannelInit,
        tasks: &TaskSender,
    ) -> Result<Self> {
        if let Err(e) = init.validate(kind) {
            error!(label = %label, kind = ?kind, "Failed to initialize data channel: {}", e);
            return Err(e);
        }

        if kind == TransportKind::Sctp && label.len() > MAX_LABEL_BYTES {
            error!(bytes = label.len(), "Data channel label too long");
            return Err(Error::InvalidConfig(format!(
                "label must be at most {} bytes, got {}",
                MAX_LABEL_BYTES,
                label.len()
            )));
        }

        let binding = match kind {
            TransportKind::Rtp => Binding::Rtp {
                send_ssrc: None,
                receive_ssrc: None,
            },
            TransportKind::Sctp => Binding::Sctp {
                id: init.id,
                handshake: HandshakeController::new(init.role),
            },
        };

        let tasks_token = CancellationToken::new();
        let mut channel = Self {
            key: ChannelKey::next(),
            label: label.to_string(),
            protocol: init.protocol,
            config: init.config,
            binding,
            state: ChannelState::Connecting,
            writable: false,
            connected_to_provider: false,
            outbound: PacketQueue::new(),
            inbound: PacketQueue::new(),
            control: PacketQueue::new(),
            observer: None,
            provider: Arc::downgrade(provider),
            stats: ChannelStats::default(),
            _tasks_guard: tasks_token.clone().drop_guard(),
            tasks_token,
        };

        debug!(
            key = %channel.key,
            label = %channel.label,
            kind = ?kind,
            "Created data channel"
        );

        if kind == TransportKind::Sctp {
            channel.on_transport_channel_created();

            if provider.ready_to_send() {
                let task = ChannelTask::new(
                    channel.key,
                    TaskKind::ChannelReady,
                    channel.tasks_token.clone(),
                );
                if !tasks.post(task) {
                    warn!(label = %channel.label, "Task queue closed; ready notification lost");
                }
            }
        }

        Ok(channel)
    }

    // ------------------------------------------------------------------ //
    // Accessors
    // ------------------------------------------------------------------ //

    pub fn key(&self) -> ChannelKey {
        self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn kind(&self) -> TransportKind {
        match self.binding {
            Binding::Rtp { .. } => TransportKind::Rtp,
            Binding::Sctp { .. } => TransportKind::Sctp,
        }
    }

    /// SCTP stream id, once assigned. Always `None` for RTP channels.
    pub fn id(&self) -> Option<StreamId> {
        match self.binding {
            Binding::Sctp { id, .. } => id,
            Binding::Rtp { .. } => None,
        }
    }

    /// RTP send ssrc, once assigned
    pub fn send_ssrc(&self) -> Option<Ssrc> {
        match self.binding {
            Binding::Rtp { send_ssrc, .. } => send_ssrc,
            Binding::Sctp { .. } => None,
        }
    }

    /// RTP receive ssrc, once assigned
    pub fn receive_ssrc(&self) -> Option<Ssrc> {
        match self.binding {
            Binding::Rtp { receive_ssrc, .. } => receive_ssrc,
            Binding::Sctp { .. } => None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Handshake progress; RTP channels are always `Ready`
    pub fn handshake_state(&self) -> HandshakeState {
        match &self.binding {
            Binding::Sctp { handshake, .. } => handshake.state(),
            Binding::Rtp { .. } => HandshakeState::Ready,
        }
    }

    /// RTP channels never guarantee delivery
    pub fn reliable(&self) -> bool {
        match self.binding {
            Binding::Rtp { .. } => false,
            Binding::Sctp { .. } => self.config.is_reliable(),
        }
    }

    pub fn ordered(&self) -> bool {
        self.config.ordered
    }

    /// Bytes waiting in the outbound queue
    pub fn buffered_amount(&self) -> u64 {
        self.outbound.byte_count() as u64
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_connected_to_provider(&self) -> bool {
        self.connected_to_provider
    }

    pub fn has_observer(&self) -> bool {
        self.observer.is_some()
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    // ------------------------------------------------------------------ //
    // Application-facing operations
    // ------------------------------------------------------------------ //

    /// Attach the observer and hand it everything received so far
    pub fn register_observer(&mut self, observer: Box<dyn DataChannelObserver>) {
        self.observer = Some(observer);
        self.deliver_queued_received_data();
    }

    /// Detach the observer; later inbound data is queued again
    pub fn unregister_observer(&mut self) -> Option<Box<dyn DataChannelObserver>> {
        self.observer.take()
    }

    /// Send one message
    ///
    /// SCTP channels report success whenever the message was accepted or
    /// queued; transport failures surface as a state change to `Closing`.
    /// RTP channels report the immediate transport result.
    ///
    /// # Errors
    ///
    /// [`Error::NotOpen`] if the channel is not open (nothing is queued),
    /// [`Error::SendFailed`] if an RTP send was refused.
    pub fn send(&mut self, buffer: DataBuffer) -> Result<()> {
        if self.state != ChannelState::Open {
            return Err(Error::NotOpen(self.state));
        }

        if buffer.is_empty() {
            return Ok(());
        }

        let is_sctp = matches!(self.binding, Binding::Sctp { .. });

        // A non-empty queue means we are waiting for ready-to-send; stay behind it.
        if is_sctp && !self.outbound.is_empty() {
            if !self.queue_send(buffer) {
                self.close();
            }
            return Ok(());
        }

        let sent = self.send_data_message(&buffer, true);
        if is_sctp || sent {
            Ok(())
        } else {
            Err(Error::SendFailed(format!(
                "transport refused {} bytes on channel '{}'",
                buffer.len(),
                self.label
            )))
        }
    }

    /// Start closing. Queued outbound data still drains; new sends fail.
    pub fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }
        self.do_close();
    }

    // ------------------------------------------------------------------ //
    // Transport-facing operations
    // ------------------------------------------------------------------ //

    /// Assign the RTP receive ssrc. Only the first assignment counts.
    pub fn set_receive_ssrc(&mut self, ssrc: Ssrc) {
        match &mut self.binding {
            Binding::Rtp { receive_ssrc, .. } => {
                if receive_ssrc.is_some() {
                    return;
                }
                *receive_ssrc = Some(ssrc);
            }
            Binding::Sctp { .. } => {
                warn!(label = %self.label, "Ignoring receive ssrc on an SCTP data channel");
                return;
            }
        }
        self.update_state();
    }

    /// Assign the RTP send ssrc. Only the first assignment counts.
    pub fn set_send_ssrc(&mut self, ssrc: Ssrc) {
        match &mut self.binding {
            Binding::Rtp { send_ssrc, .. } => {
                if send_ssrc.is_some() {
                    return;
                }
                *send_ssrc = Some(ssrc);
            }
            Binding::Sctp { .. } => {
                warn!(label = %self.label, "Ignoring send ssrc on an SCTP data channel");
                return;
            }
        }
        self.update_state();
    }

    /// Stop sending on this RTP channel; sends fail until a new send ssrc
    /// is assigned
    pub fn reset_send_ssrc(&mut self) {
        let Binding::Rtp { send_ssrc, .. } = &mut self.binding else {
            return;
        };
        if send_ssrc.take().is_some() {
            debug!(label = %self.label, "Cleared RTP send ssrc");
            self.update_state();
        }
    }

    /// Assign the SCTP stream id and open the stream on the transport
    pub fn set_sctp_stream_id(&mut self, sid: StreamId) {
        match &mut self.binding {
            Binding::Sctp { id, .. } => {
                if id.is_some() {
                    return;
                }
                *id = Some(sid);
            }
            Binding::Rtp { .. } => {
                warn!(label = %self.label, "Ignoring stream id on an RTP data channel");
                return;
            }
        }

        debug!(label = %self.label, sid, "Assigned SCTP stream id");
        if let Some(provider) = self.provider.upgrade() {
            provider.add_stream(sid);
        }
        self.update_state();
    }

    /// The transport now exists; attach to it and re-announce our stream
    pub fn on_transport_channel_created(&mut self) {
        let Binding::Sctp { id, .. } = self.binding else {
            self.update_state();
            return;
        };

        if !self.connected_to_provider {
            self.connected_to_provider = self.connect_to_provider();
        }

        // The stream may not have been known when we first connected.
        if let (Some(sid), Some(provider)) = (id, self.provider.upgrade()) {
            provider.add_stream(sid);
        }
    }

    /// The transport's writability changed
    ///
    /// When writable, pending control messages go out first, then queued
    /// data in FIFO order until the transport blocks again.
    pub fn on_channel_ready(&mut self, writable: bool) {
        self.writable = writable;
        if !writable {
            return;
        }

        self.send_queued_control_messages();
        self.send_queued_data_messages();
        self.update_state();
    }

    /// The remote peer closed the channel
    pub fn remote_peer_request_close(&mut self) {
        self.do_close();
    }

    /// The transport itself is shutting down
    pub fn on_transport_engine_close(&mut self) {
        self.do_close();
    }

    /// Run a task posted by this channel. Tasks for other channels or for
    /// a dropped channel are ignored.
    pub fn run_task(&mut self, task: ChannelTask) {
        if task.key() != self.key || task.is_cancelled() {
            return;
        }

        match task.kind() {
            TaskKind::ChannelReady => self.on_channel_ready(true),
        }
    }

    /// Inbound message from the transport
    pub fn on_data_received(&mut self, params: &ReceiveParams, payload: Bytes) {
        if self.expected_receive_id() != Some(params.id) {
            return;
        }

        let binary = match params.message_type {
            MessageType::Control => {
                self.on_control_received(params.id, &payload);
                return;
            }
            MessageType::Binary => true,
            MessageType::Text => false,
        };

        trace!(label = %self.label, id = params.id, bytes = payload.len(), "Received DATA message");

        // Any DATA proves the peer processed our OPEN, even without OPEN-ACK.
        if let Binding::Sctp { handshake, .. } = &mut self.binding {
            if handshake.on_data_received() {
                debug!(label = %self.label, "Handshake completed by first DATA message");
            }
        }

        let buffer = DataBuffer::new(payload, binary);
        if self.state == ChannelState::Open {
            if let Some(observer) = self.observer.as_mut() {
                self.stats.messages_received += 1;
                self.stats.bytes_received += buffer.len() as u64;
                observer.on_message(buffer);
                return;
            }
        }

        if self.inbound.byte_count() + buffer.len() > MAX_QUEUED_RECEIVE_BYTES {
            error!(
                label = %self.label,
                queued = self.inbound.byte_count(),
                "Queued received data exceeds the max buffer size"
            );

            self.inbound.clear();
            if matches!(self.binding, Binding::Sctp { .. }) {
                self.close();
            }
            return;
        }

        self.stats.messages_received += 1;
        self.stats.bytes_received += buffer.len() as u64;
        self.inbound.push(buffer);
    }

    // ------------------------------------------------------------------ //
    // Internals
    // ------------------------------------------------------------------ //

    fn expected_receive_id(&self) -> Option<u32> {
        match self.binding {
            Binding::Rtp { receive_ssrc, .. } => receive_ssrc,
            Binding::Sctp { id, .. } => id.map(u32::from),
        }
    }

    fn on_control_received(&mut self, id: u32, payload: &[u8]) {
        let Binding::Sctp { handshake, .. } = &mut self.binding else {
            warn!(label = %self.label, ssrc = id, "RTP data channel received CONTROL message");
            return;
        };

        if !handshake.is_waiting_for_ack() {
            warn!(sid = id, "Data channel received unexpected CONTROL message");
            return;
        }

        match ControlMessage::parse(payload) {
            Ok(ControlMessage::OpenAck) => {
                handshake.on_open_ack();
                info!(sid = id, "Data channel received OPEN_ACK message");
            }
            Ok(other) => {
                warn!(sid = id, message = ?other, "Data channel expected OPEN_ACK");
            }
            Err(e) => {
                warn!(sid = id, "Data channel failed to parse OPEN_ACK message: {}", e);
            }
        }
    }

    fn do_close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }

        if let Binding::Rtp {
            send_ssrc,
            receive_ssrc,
        } = &mut self.binding
        {
            *send_ssrc = None;
            *receive_ssrc = None;
        }

        self.set_state(ChannelState::Closing);
        self.update_state();
    }

    /// Re-evaluate state transitions from the current flags and queues
    fn update_state(&mut self) {
        match self.state {
            ChannelState::Connecting => {
                let (ssrcs_symmetric, is_rtp) = match self.binding {
                    Binding::Rtp {
                        send_ssrc,
                        receive_ssrc,
                    } => (send_ssrc.is_some() == receive_ssrc.is_some(), true),
                    Binding::Sctp { .. } => (true, false),
                };
                if !ssrcs_symmetric {
                    return;
                }

                if is_rtp && !self.connected_to_provider {
                    self.connected_to_provider = self.connect_to_provider();
                }
                if !self.connected_to_provider {
                    return;
                }

                // A control message already queued behind a blocked transport
                // is the pending one; do not emit a second copy.
                if self.writable && self.control.is_empty() {
                    if let Some(pending) = self.pending_control() {
                        self.send_handshake_message(pending);
                        if self.state != ChannelState::Connecting {
                            return;
                        }
                    }
                }

                if self.writable && self.handshake_allows_open() {
                    self.set_state(ChannelState::Open);
                    // Data received before we became writable goes out now.
                    self.deliver_queued_received_data();
                }
            }
            ChannelState::Open => {}
            ChannelState::Closing => {
                if self.outbound.is_empty() && self.control.is_empty() {
                    if self.connected_to_provider {
                        self.disconnect_from_provider();
                    }

                    let ssrc_set = match self.binding {
                        Binding::Rtp {
                            send_ssrc,
                            receive_ssrc,
                        } => send_ssrc.is_some() || receive_ssrc.is_some(),
                        Binding::Sctp { .. } => false,
                    };
                    if !self.connected_to_provider && !ssrc_set {
                        self.set_state(ChannelState::Closed);
                    }
                }
            }
            ChannelState::Closed => {}
        }
    }

    fn set_state(&mut self, state: ChannelState) {
        if self.state == state || self.state > state {
            return;
        }

        debug!(label = %self.label, from = ?self.state, to = ?state, "Data channel state change");
        self.state = state;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_state_change(state);
        }
    }

    fn pending_control(&self) -> Option<PendingControl> {
        match &self.binding {
            Binding::Sctp {
                id: Some(_),
                handshake,
            } => handshake.pending_control(),
            _ => None,
        }
    }

    fn handshake_allows_open(&self) -> bool {
        match &self.binding {
            Binding::Sctp { handshake, .. } => handshake.allows_open(),
            Binding::Rtp { .. } => true,
        }
    }

    fn connect_to_provider(&self) -> bool {
        match self.provider.upgrade() {
            Some(provider) => provider.connect_data_channel(self.key),
            None => false,
        }
    }

    fn disconnect_from_provider(&mut self) {
        if !self.connected_to_provider {
            return;
        }

        if let Some(provider) = self.provider.upgrade() {
            provider.disconnect_data_channel(self.key);
            if let Binding::Sctp { id: Some(sid), .. } = self.binding {
                provider.remove_stream(sid);
            }
        }
        self.connected_to_provider = false;
        debug!(label = %self.label, "Disconnected data channel from provider");
    }

    fn deliver_queued_received_data(&mut self) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };

        while let Some(buffer) = self.inbound.pop_front() {
            observer.on_message(buffer);
        }
    }

    fn notify_buffered_amount_change(&mut self, previous_amount: usize) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_buffered_amount_change(previous_amount as u64);
        }
    }

    /// Queue for later transmission; refuses once the queue would exceed
    /// [`MAX_QUEUED_SEND_BYTES`]
    fn queue_send(&mut self, buffer: DataBuffer) -> bool {
        let start_buffered_amount = self.outbound.byte_count();
        if start_buffered_amount + buffer.len() > MAX_QUEUED_SEND_BYTES {
            error!(
                label = %self.label,
                queued = start_buffered_amount,
                bytes = buffer.len(),
                "Can't buffer any more data for the data channel"
            );
            return false;
        }

        self.outbound.push(buffer);
        if self.outbound.byte_count() > start_buffered_amount {
            self.notify_buffered_amount_change(start_buffered_amount);
        }
        true
    }

    fn send_queued_data_messages(&mut self) {
        if self.outbound.is_empty() {
            return;
        }

        let start_buffered_amount = self.outbound.byte_count();
        while let Some(buffer) = self.outbound.front().cloned() {
            if !self.send_data_message(&buffer, false) {
                // Leave it queued; the next ready signal retries it.
                break;
            }
            self.outbound.pop_front();
        }

        if self.outbound.byte_count() < start_buffered_amount {
            self.notify_buffered_amount_change(start_buffered_amount);
        }
    }

    fn send_data_message(&mut self, buffer: &DataBuffer, queue_if_blocked: bool) -> bool {
        let message_type = MessageType::for_buffer(buffer.binary);
        let (params, is_sctp) = match &self.binding {
            Binding::Sctp { id, handshake } => {
                let Some(sid) = id else {
                    warn!(label = %self.label, "Cannot send before a stream id is assigned");
                    return false;
                };

                let ordered = handshake.data_ordered(self.config.ordered);
                if ordered && !self.config.ordered {
                    trace!(
                        label = %self.label,
                        "Sending data as ordered for unordered channel until OPEN_ACK arrives"
                    );
                }

                let params = SendParams {
                    id: u32::from(*sid),
                    message_type,
                    ordered,
                    max_retransmits: self.config.max_retransmits,
                    max_retransmit_time: self.config.max_retransmit_time,
                };
                (params, true)
            }
            Binding::Rtp { send_ssrc, .. } => {
                let Some(ssrc) = send_ssrc else {
                    warn!(label = %self.label, "Cannot send without a send ssrc");
                    return false;
                };

                let params = SendParams {
                    id: *ssrc,
                    message_type,
                    ordered: self.config.ordered,
                    max_retransmits: None,
                    max_retransmit_time: None,
                };
                (params, false)
            }
        };

        let result = match self.provider.upgrade() {
            Some(provider) => provider.send(&params, &buffer.data),
            None => SendResult::Error,
        };

        match result {
            SendResult::Success => {
                self.stats.messages_sent += 1;
                self.stats.bytes_sent += buffer.len() as u64;
                return true;
            }
            SendResult::Blocked if is_sctp => {
                if !queue_if_blocked || self.queue_send(buffer.clone()) {
                    return false;
                }
            }
            SendResult::Blocked => return false,
            SendResult::Error => {}
        }

        error!(
            label = %self.label,
            result = ?result,
            "Closing the data channel due to a failure to send data"
        );
        self.close();
        false
    }

    fn send_handshake_message(&mut self, pending: PendingControl) {
        let message = match pending {
            PendingControl::Open => ControlMessage::Open(OpenMessage::from_init(
                &self.label,
                &ChannelInit {
                    config: self.config.clone(),
                    protocol: self.protocol.clone(),
                    id: self.id(),
                    role: crate::config::OpenHandshakeRole::Opener,
                },
            )),
            PendingControl::OpenAck => ControlMessage::OpenAck,
        };
        self.send_control_message(message.encode());
    }

    fn send_queued_control_messages(&mut self) {
        let mut control_packets = PacketQueue::new();
        control_packets.swap(&mut self.control);

        while let Some(buffer) = control_packets.pop_front() {
            if !self.send_control_message(buffer.data) {
                // Keep the remainder behind whatever was just re-queued.
                while let Some(rest) = control_packets.pop_front() {
                    self.control.push(rest);
                }
                break;
            }
        }
    }

    fn send_control_message(&mut self, payload: Bytes) -> bool {
        let Binding::Sctp { id: Some(sid), .. } = &self.binding else {
            warn!(label = %self.label, "Cannot send CONTROL message without a stream id");
            return false;
        };
        let sid = *sid;

        let params = SendParams {
            id: u32::from(sid),
            message_type: MessageType::Control,
            // OPEN and OPEN-ACK are always ordered
            ordered: true,
            max_retransmits: None,
            max_retransmit_time: None,
        };

        let result = match self.provider.upgrade() {
            Some(provider) => provider.send(&params, &payload),
            None => SendResult::Error,
        };

        match result {
            SendResult::Success => {
                info!(sid, "Sent CONTROL message");
                if let Binding::Sctp { handshake, .. } = &mut self.binding {
                    handshake.on_control_sent();
                }
                true
            }
            SendResult::Blocked => {
                self.control.push(DataBuffer::binary(payload));
                false
            }
            SendResult::Error => {
                error!(
                    sid,
                    "Closing the data channel due to a failure to send the CONTROL message"
                );
                self.close();
                false
            }
        }
    }
}

impl std::fmt::Debug for DataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataChannel")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("kind", &self.kind())
            .field("state", &self.state)
            .field("handshake", &self.handshake_state())
            .field("buffered_amount", &self.buffered_amount())
            .finish()
    }
}
