//! Error types for the protocol crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A VarInt ran past its maximum encoded width.
    #[error("varint is longer than the maximum of 5 bytes")]
    VarIntTooLong,

    /// A length prefix announced a packet larger than the decoder accepts.
    #[error("packet of {size} bytes exceeds the {max} byte limit")]
    PacketTooLarge { size: usize, max: usize },

    /// A length prefix was negative, zero, or otherwise impossible.
    #[error("invalid packet length: {0}")]
    InvalidLength(i32),

    /// A complete payload ended before the data it promised.
    #[error("payload is truncated")]
    Truncated,

    /// A packet arrived with an id the current exchange does not allow.
    #[error("unexpected packet id {got:#04x}, expected {expected:#04x}")]
    UnexpectedPacket { expected: i32, got: i32 },

    /// A length-prefixed string was not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidString,

    /// The status document could not be parsed.
    #[error("invalid status JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
