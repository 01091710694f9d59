//! Error type shared by every decoder and encoder in this crate.
//!
//! Decoders report *why* a datagram was rejected so the caller can log it, but
//! the server never forwards these to peers: a malformed datagram simply gets
//! no reply.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("datagram too short: need {needed} bytes, got {actual}")]
    TooShort { needed: usize, actual: usize },

    #[error("datagram length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("unexpected tag byte {0:#04x}")]
    UnexpectedTag(u8),

    #[error("nested message truncated: declared {declared} bytes, {available} available")]
    Truncated { declared: usize, available: usize },

    #[error("name is not valid UTF-8")]
    InvalidUtf8,

    #[error("field too long: {len} bytes (max {max})")]
    FieldTooLong { len: usize, max: usize },

    #[error("invalid game code: {0}")]
    InvalidGameCode(String),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
