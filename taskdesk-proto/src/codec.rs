//! Serialization for the taskdesk store protocol.
//!
//! Requests and replies travel as postcard-encoded binary WebSocket frames;
//! the transport preserves message boundaries, so no extra framing is
//! applied.

use crate::store::{StoreReply, StoreRequest};

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Encodes a [`StoreRequest`] into bytes using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the request cannot be serialized.
pub fn encode_request(request: &StoreRequest) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(request).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`StoreRequest`] from a byte slice using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode_request(bytes: &[u8]) -> Result<StoreRequest, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Encodes a [`StoreReply`] into bytes using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the reply cannot be serialized.
pub fn encode_reply(reply: &StoreReply) -> Result<Vec<u8>, CodecError> {
    postcard::to_allocvec(reply).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Decodes a [`StoreReply`] from a byte slice using postcard.
///
/// # Errors
///
/// Returns `CodecError::Serialization` if the bytes cannot be deserialized.
pub fn decode_reply(bytes: &[u8]) -> Result<StoreReply, CodecError> {
    postcard::from_bytes(bytes).map_err(|e| CodecError::Serialization(e.to_string()))
}
