//! Data channel engine for RemoteMedia WebRTC transports
//!
//! This crate implements the per-channel protocol logic of WebRTC data
//! channels: the lifecycle state machine, the in-band OPEN / OPEN-ACK
//! handshake, send and receive buffering, and the registry that multiplexes
//! many channels over one transport. The transport itself (SCTP association
//! or legacy RTP session) is abstracted behind [`DataChannelProvider`].
//!
//! # Features
//!
//! - **SCTP and RTP bindings**: stream-id or ssrc addressing, fixed per channel
//! - **In-band handshake**: DCEP OPEN / OPEN-ACK with implicit ack on first data
//! - **Bounded buffering**: 16 MB send and receive queues with FIFO draining
//! - **Partial reliability**: retransmit-count or lifetime limits per channel
//! - **Stream id allocation**: even/odd ids by DTLS role, reused after close
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Application (DataChannelObserver)                     │
//! │  ↑ messages, state, buffered amount                    │
//! │  ChannelRegistry                                       │
//! │  ├─ DataChannel (one per label / stream id)            │
//! │  │   ├─ HandshakeController (OPEN / OPEN-ACK)          │
//! │  │   └─ PacketQueue × 3 (outbound, inbound, control)   │
//! │  ├─ TaskQueue (deferred ready notifications)           │
//! │  └─ SCTP stream id allocator                           │
//! │     ↓                                                  │
//! │  DataChannelProvider (SCTP association / RTP session)  │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use remotemedia_datachannel::{ChannelConfig, ChannelInit, TransportKind};
//!
//! // Unordered, at most 3 retransmissions
//! let init = ChannelInit::new(ChannelConfig::partial_reliable_rexmit(3).with_ordered(false))
//!     .with_protocol("telemetry");
//!
//! assert!(init.validate(TransportKind::Sctp).is_ok());
//! assert!(init.validate(TransportKind::Rtp).is_err());
//! ```

#![warn(clippy::all)]

pub mod channels;
pub mod config;
pub mod context;
pub mod error;
pub mod observer;
pub mod provider;
pub mod registry;

// Re-exports for public API
pub use channels::{
    ChannelState, ChannelStats, ControlMessage, DataBuffer, DataChannel, HandshakeState,
    OpenMessage,
};
pub use config::{
    ChannelConfig, ChannelInit, OpenHandshakeRole, RegistryConfig, StreamId, TransportKind,
    MAX_LABEL_BYTES, MAX_QUEUED_RECEIVE_BYTES, MAX_QUEUED_SEND_BYTES, MAX_SCTP_SID,
};
pub use context::{ChannelTask, TaskKind, TaskQueue, TaskSender};
pub use error::{Error, Result};
pub use observer::{ChannelEvent, ChannelEventSender, DataChannelObserver};
pub use provider::{
    ChannelKey, DataChannelProvider, MessageType, ReceiveParams, SendParams, SendResult, Ssrc,
};
pub use registry::{ChannelRegistry, DtlsRole, RtpStream};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the crate version
pub fn version() -> &'static str {
    VERSION
}
