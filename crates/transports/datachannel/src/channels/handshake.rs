//! OPEN / OPEN-ACK handshake state machine
//!
//! Decides which control message a channel still owes its peer and whether
//! application data may go out unordered yet.

use serde::{Deserialize, Serialize};

use crate::config::OpenHandshakeRole;

/// Handshake progress of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeState {
    /// Not yet resolved from the role; never observed after construction
    Init,
    /// OPEN must be sent once the transport is writable
    ShouldSendOpen,
    /// OPEN sent, waiting for OPEN-ACK or the first DATA message
    WaitingForAck,
    /// OPEN-ACK must be sent once the transport is writable
    ShouldSendAck,
    /// Handshake complete
    Ready,
}

/// Control message the handshake still has to put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingControl {
    Open,
    OpenAck,
}

/// Tracks one channel's handshake
#[derive(Debug, Clone)]
pub struct HandshakeController {
    state: HandshakeState,
}

impl HandshakeController {
    /// Resolve the initial state from the handshake role
    pub fn new(role: OpenHandshakeRole) -> Self {
        let state = match role {
            OpenHandshakeRole::PreNegotiated => HandshakeState::Ready,
            OpenHandshakeRole::Opener => HandshakeState::ShouldSendOpen,
            OpenHandshakeRole::Acker => HandshakeState::ShouldSendAck,
        };
        Self { state }
    }

    /// A controller that needs no handshake at all
    pub fn ready() -> Self {
        Self {
            state: HandshakeState::Ready,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == HandshakeState::Ready
    }

    /// Waiting for the peer to confirm our OPEN
    pub fn is_waiting_for_ack(&self) -> bool {
        self.state == HandshakeState::WaitingForAck
    }

    /// Data may flow from the local side's point of view
    pub fn allows_open(&self) -> bool {
        matches!(
            self.state,
            HandshakeState::Ready | HandshakeState::WaitingForAck
        )
    }

    /// The control message still owed to the peer, if any
    pub fn pending_control(&self) -> Option<PendingControl> {
        match self.state {
            HandshakeState::ShouldSendOpen => Some(PendingControl::Open),
            HandshakeState::ShouldSendAck => Some(PendingControl::OpenAck),
            _ => None,
        }
    }

    /// Effective ordering for an outgoing DATA message.
    ///
    /// Until the handshake is `Ready` the peer may not have processed our
    /// OPEN, so data must not overtake it.
    pub fn data_ordered(&self, configured: bool) -> bool {
        configured || !self.is_ready()
    }

    /// A control message was accepted by the transport
    pub fn on_control_sent(&mut self) {
        self.state = match self.state {
            HandshakeState::ShouldSendAck => HandshakeState::Ready,
            HandshakeState::ShouldSendOpen => HandshakeState::WaitingForAck,
            other => other,
        };
    }

    /// An OPEN-ACK arrived. Returns true if it completed the handshake.
    pub fn on_open_ack(&mut self) -> bool {
        if self.is_waiting_for_ack() {
            self.state = HandshakeState::Ready;
            return true;
        }
        false
    }

    /// A DATA message arrived. Peers that never send OPEN-ACK still prove
    /// they processed our OPEN by sending data. Returns true on transition.
    pub fn on_data_received(&mut self) -> bool {
        self.on_open_ack()
    }
}
