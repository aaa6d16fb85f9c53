//! Decoding and encoding of datagram payloads.

use serde_json::Value;
use thiserror::Error;

use crate::message::{MessageKind, WireMessage};

/// Largest payload the protocol accepts, in bytes.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Reasons a payload could not be turned into a [`WireMessage`].
///
/// The relay treats all of these the same way: the datagram is dropped
/// and the sender gets no reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },

    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("missing string `type` field")]
    MissingType,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid fields for `{kind}`: {reason}")]
    InvalidFields { kind: &'static str, reason: String },
}

/// Decodes one datagram payload.
///
/// # Errors
///
/// Returns a [`DecodeError`] for oversized payloads, invalid JSON, a
/// missing or unrecognized `type`, or missing/mistyped fields.
pub fn decode(payload: &[u8]) -> Result<WireMessage, DecodeError> {
    if payload.len() > MAX_DATAGRAM_SIZE {
        return Err(DecodeError::TooLarge {
            size: payload.len(),
            max: MAX_DATAGRAM_SIZE,
        });
    }

    let value: Value =
        serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;

    let kind =
        MessageKind::from_tag(tag).ok_or_else(|| DecodeError::UnknownType(tag.to_string()))?;

    serde_json::from_value(value).map_err(|e| DecodeError::InvalidFields {
        kind: kind.tag(),
        reason: e.to_string(),
    })
}

/// Encodes a message as a datagram payload.
///
/// # Errors
///
/// Only fails if serde_json cannot serialize the message, which does not
/// happen for the types defined here.
pub fn encode(message: &WireMessage) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}
