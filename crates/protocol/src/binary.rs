//! Binary frame layout: one flag byte followed by the payload.
//!
//! ```text
//! +------+---------------------------------------------+
//! | 0x00 | UTF-8 JSON snapshot                         |
//! | 0x01 | gzip (or zlib) stream of UTF-8 JSON snapshot|
//! +------+---------------------------------------------+
//! ```

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};
use flate2::Compression;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::GzEncoder;

use crate::ProtocolError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound on an inflated payload. Real snapshots stay well below 1 MiB.
pub const MAX_INFLATED_SIZE: usize = 16 * 1024 * 1024;

/// Leading byte of every binary frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFlag {
    /// Payload is plain UTF-8 JSON.
    Raw = 0x00,
    /// Payload is compressed UTF-8 JSON.
    Compressed = 0x01,
}

impl FrameFlag {
    pub fn from_byte(byte: u8) -> Result<Self, ProtocolError> {
        match byte {
            0x00 => Ok(Self::Raw),
            0x01 => Ok(Self::Compressed),
            other => Err(ProtocolError::UnknownFlag(other)),
        }
    }

    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Encoder effort used by the feed server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    Fast,
    #[default]
    Default,
    Best,
}

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Fast => Compression::fast(),
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::Best => Compression::best(),
        }
    }
}

/// Split a binary frame into its flag and payload.
pub fn split_frame(frame: &[u8]) -> Result<(FrameFlag, &[u8]), ProtocolError> {
    let (&first, payload) = frame.split_first().ok_or(ProtocolError::EmptyFrame)?;
    Ok((FrameFlag::from_byte(first)?, payload))
}

/// Build a binary frame from a flag and an already-encoded payload.
pub fn build_frame(flag: FrameFlag, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + 1);
    buf.put_u8(flag.as_byte());
    buf.put_slice(payload);
    buf.freeze()
}

/// Inflate a compressed payload. Accepts gzip and zlib containers.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    inflate_limited(data, MAX_INFLATED_SIZE)
}

/// Inflate, refusing output larger than `limit` bytes.
pub fn inflate_limited(data: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).min(limit));
    // One byte past the limit tells a full payload from an oversized one
    let cap = limit as u64 + 1;
    let read = if data.starts_with(&GZIP_MAGIC) {
        GzDecoder::new(data).take(cap).read_to_end(&mut out)
    } else {
        ZlibDecoder::new(data).take(cap).read_to_end(&mut out)
    };
    read.map_err(ProtocolError::Decompress)?;

    if out.len() > limit {
        return Err(ProtocolError::Oversized { limit });
    }
    Ok(out)
}

/// Gzip a payload.
pub fn deflate(data: &[u8], level: CompressionLevel) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), level.into());
    encoder.write_all(data).map_err(ProtocolError::Compress)?;
    encoder.finish().map_err(ProtocolError::Compress)
}
