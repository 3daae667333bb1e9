//! Data channel payloads and the in-band OPEN / OPEN-ACK control messages
//!
//! Control messages follow the DCEP layout (RFC 8832): a one-byte message
//! type, and for OPEN a fixed 12-byte header followed by the label and
//! protocol strings. All integers are big-endian.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::Duration;

use crate::config::{ChannelConfig, ChannelInit, OpenHandshakeRole, StreamId};
use crate::{Error, Result};

const MESSAGE_TYPE_OPEN_ACK: u8 = 0x02;
const MESSAGE_TYPE_OPEN: u8 = 0x03;

const CHANNEL_RELIABLE: u8 = 0x00;
const CHANNEL_PARTIAL_RELIABLE_REXMIT: u8 = 0x01;
const CHANNEL_PARTIAL_RELIABLE_TIMED: u8 = 0x02;
const CHANNEL_UNORDERED_BIT: u8 = 0x80;

const OPEN_HEADER_LEN: usize = 12;

/// One application message: an opaque payload plus its text/binary flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBuffer {
    /// Payload bytes
    pub data: Bytes,
    /// Binary (true) or UTF-8 text (false)
    pub binary: bool,
}

impl DataBuffer {
    /// Create a buffer
    pub fn new(data: impl Into<Bytes>, binary: bool) -> Self {
        Self {
            data: data.into(),
            binary,
        }
    }

    /// Create a binary buffer
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::new(data, true)
    }

    /// Create a text buffer
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Bytes::from(text.into()), false)
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for a zero-length payload
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Payload as text, if this is a text buffer holding valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        if self.binary {
            return None;
        }
        std::str::from_utf8(&self.data).ok()
    }
}

/// The OPEN request announcing a new channel to the remote peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenMessage {
    /// Channel label
    pub label: String,
    /// Application sub-protocol
    pub protocol: String,
    /// Scheduling priority hint
    pub priority: u16,
    /// Ordering and reliability of the channel
    pub config: ChannelConfig,
}

impl OpenMessage {
    /// Describe a locally created channel
    pub fn from_init(label: &str, init: &ChannelInit) -> Self {
        Self {
            label: label.to_string(),
            protocol: init.protocol.clone(),
            priority: 0,
            config: ChannelConfig {
                negotiated: false,
                ..init.config.clone()
            },
        }
    }

    /// Build the init for the answering side of this OPEN, on stream `id`
    pub fn to_init(&self, id: StreamId) -> ChannelInit {
        ChannelInit {
            config: ChannelConfig {
                negotiated: false,
                ..self.config.clone()
            },
            protocol: self.protocol.clone(),
            id: Some(id),
            role: OpenHandshakeRole::Acker,
        }
    }

    fn channel_type(&self) -> (u8, u32) {
        let (kind, param) = if let Some(rexmit) = self.config.max_retransmits {
            (CHANNEL_PARTIAL_RELIABLE_REXMIT, u32::from(rexmit))
        } else if let Some(lifetime) = self.config.max_retransmit_time {
            let millis = u32::try_from(lifetime.as_millis()).unwrap_or(u32::MAX);
            (CHANNEL_PARTIAL_RELIABLE_TIMED, millis)
        } else {
            (CHANNEL_RELIABLE, 0)
        };

        if self.config.ordered {
            (kind, param)
        } else {
            (kind | CHANNEL_UNORDERED_BIT, param)
        }
    }
}

/// In-band control message exchanged during the channel handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// Request to open a channel
    Open(OpenMessage),
    /// Acknowledgement of an OPEN
    OpenAck,
}

impl ControlMessage {
    /// Serialize to the wire format
    pub fn encode(&self) -> Bytes {
        match self {
            ControlMessage::OpenAck => Bytes::from_static(&[MESSAGE_TYPE_OPEN_ACK]),
            ControlMessage::Open(open) => {
                let (channel_type, reliability) = open.channel_type();
                let label = open.label.as_bytes();
                let protocol = open.protocol.as_bytes();

                let mut buf = BytesMut::with_capacity(OPEN_HEADER_LEN + label.len() + protocol.len());
                buf.put_u8(MESSAGE_TYPE_OPEN);
                buf.put_u8(channel_type);
                buf.put_u16(open.priority);
                buf.put_u32(reliability);
                buf.put_u16(clamp_len(label.len()));
                buf.put_u16(clamp_len(protocol.len()));
                buf.put_slice(&label[..usize::from(clamp_len(label.len()))]);
                buf.put_slice(&protocol[..usize::from(clamp_len(protocol.len()))]);
                buf.freeze()
            }
        }
    }

    /// Parse a control payload
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedControlMessage`] for empty or truncated
    /// payloads, unknown message or channel types, and non-UTF-8 strings.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let Some(&message_type) = payload.first() else {
            return Err(Error::MalformedControlMessage("empty payload".to_string()));
        };

        match message_type {
            MESSAGE_TYPE_OPEN_ACK => Ok(ControlMessage::OpenAck),
            MESSAGE_TYPE_OPEN => parse_open(payload).map(ControlMessage::Open),
            other => Err(Error::MalformedControlMessage(format!(
                "unknown message type 0x{:02x}",
                other
            ))),
        }
    }

    /// True for OPEN-ACK
    pub fn is_open_ack(&self) -> bool {
        matches!(self, ControlMessage::OpenAck)
    }
}

fn clamp_len(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

fn parse_open(payload: &[u8]) -> Result<OpenMessage> {
    if payload.len() < OPEN_HEADER_LEN {
        return Err(Error::MalformedControlMessage(format!(
            "OPEN header truncated: {} bytes",
            payload.len()
        )));
    }

    let mut buf = &payload[1..];
    let channel_type = buf.get_u8();
    let priority = buf.get_u16();
    let reliability = buf.get_u32();
    let label_len = usize::from(buf.get_u16());
    let protocol_len = usize::from(buf.get_u16());

    if buf.remaining() < label_len + protocol_len {
        return Err(Error::MalformedControlMessage(format!(
            "OPEN body truncated: need {} bytes, have {}",
            label_len + protocol_len,
            buf.remaining()
        )));
    }

    let label = read_string(&buf[..label_len], "label")?;
    let protocol = read_string(&buf[label_len..label_len + protocol_len], "protocol")?;

    let ordered = channel_type & CHANNEL_UNORDERED_BIT == 0;
    let (max_retransmits, max_retransmit_time) = match channel_type & !CHANNEL_UNORDERED_BIT {
        CHANNEL_RELIABLE => (None, None),
        CHANNEL_PARTIAL_RELIABLE_REXMIT => {
            (Some(u16::try_from(reliability).unwrap_or(u16::MAX)), None)
        }
        CHANNEL_PARTIAL_RELIABLE_TIMED => {
            (None, Some(Duration::from_millis(u64::from(reliability))))
        }
        other => {
            return Err(Error::MalformedControlMessage(format!(
                "unknown channel type 0x{:02x}",
                other
            )))
        }
    };

    Ok(OpenMessage {
        label,
        protocol,
        priority,
        config: ChannelConfig {
            ordered,
            max_retransmits,
            max_retransmit_time,
            negotiated: false,
        },
    })
}

fn read_string(bytes: &[u8], field: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::MalformedControlMessage(format!("{} is not UTF-8: {}", field, e)))
}
