//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while decoding or encoding a frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Empty frame")]
    EmptyFrame,

    #[error("Unknown frame flag: {0:#04x}")]
    UnknownFlag(u8),

    #[error("Decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("Decompressed payload exceeds {limit} bytes")]
    Oversized { limit: usize },

    #[error("Compression failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("Payload is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown control action: {0}")]
    UnknownAction(String),
}
