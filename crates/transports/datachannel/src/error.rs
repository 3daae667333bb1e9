//! Error types for the data channel engine

use crate::channels::ChannelState;

/// Result type alias using the data channel Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in data channel operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid channel or registry configuration. The channel is never created.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `send` was called while the channel was not open
    #[error("Data channel is not open (state: {0:?})")]
    NotOpen(ChannelState),

    /// The transport refused an RTP data message
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// An OPEN / OPEN-ACK payload could not be parsed
    #[error("Malformed control message: {0}")]
    MalformedControlMessage(String),

    /// No channel matched the given label, key or stream id
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Every stream id of the requested parity is in use
    #[error("No SCTP stream id available")]
    StreamIdExhausted,

    /// An RTP channel with this label is already registered
    #[error("Duplicate channel label: {0}")]
    DuplicateLabel(String),

    /// Any other error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::InvalidConfig(_) | Error::DuplicateLabel(_))
    }

    /// Check if this error concerns a single channel rather than the transport
    pub fn is_channel_error(&self) -> bool {
        matches!(
            self,
            Error::NotOpen(_)
                | Error::SendFailed(_)
                | Error::ChannelNotFound(_)
                | Error::MalformedControlMessage(_)
        )
    }
}
