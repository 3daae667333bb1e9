//! Data channel implementation
//!
//! Each channel multiplexes application messages over a shared transport:
//! - `queue`: byte-accounted FIFOs for outbound, inbound and control data
//! - `handshake`: OPEN / OPEN-ACK progress of SCTP channels
//! - `messages`: payload buffers and the control message codec
//! - `channel`: the per-channel state machine

pub mod channel;
pub mod handshake;
pub mod messages;
pub mod queue;

pub use channel::{ChannelState, ChannelStats, DataChannel};
pub use handshake::{HandshakeController, HandshakeState, PendingControl};
pub use messages::{ControlMessage, DataBuffer, OpenMessage};
pub use queue::PacketQueue;
