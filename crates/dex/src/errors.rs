//! Errors returned by this crate.
//!
//! This module contains the definitions for all error types returned by this crate.

use thiserror::Error;

/// Errors that may occur while parsing a dex file.
///
/// Header errors are fatal for the whole file, while string errors only
/// drop the affected entry from the string pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DexError {
    /// Magic is not `dex\n` followed by a known version
    #[error("invalid dex magic: {0:02x?}")]
    InvalidMagic(Vec<u8>),

    /// Buffer or declared header size is smaller than the fixed header
    #[error("dex header truncated: got {got} bytes, expected at least {expected}")]
    HeaderTruncated { got: u64, expected: u64 },

    /// Read of `width` bytes at `offset` does not fit into a buffer of `len` bytes
    #[error("offset out of range: {width} bytes at 0x{offset:x}, buffer size 0x{len:x}")]
    OffsetOutOfRange { offset: u64, width: u64, len: u64 },

    /// uleb128 value does not terminate within 5 bytes
    #[error("malformed uleb128 at 0x{offset:x}")]
    MalformedVarint { offset: u64 },

    /// Bytes violate the modified UTF-8 encoding
    #[error("invalid mutf-8 at byte {position}: {reason}")]
    InvalidEncoding { position: usize, reason: &'static str },

    /// Declared string length exceeds the configured limit
    #[error("string declares {declared} code units, limit is {limit}")]
    StringTooLong { declared: u32, limit: u32 },
}

/// Flat classification of every failure in the pipeline, loading included,
/// convenient for callers that only need to branch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    FileNotFound,
    NotReadable,
    FileTooLarge,
    InvalidMagic,
    HeaderTruncated,
    OffsetOutOfRange,
    MalformedVarint,
    InvalidEncoding,
    StringTooLong,
    InvalidSignature,
}

impl DexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DexError::InvalidMagic(_) => ErrorKind::InvalidMagic,
            DexError::HeaderTruncated { .. } => ErrorKind::HeaderTruncated,
            DexError::OffsetOutOfRange { .. } => ErrorKind::OffsetOutOfRange,
            DexError::MalformedVarint { .. } => ErrorKind::MalformedVarint,
            DexError::InvalidEncoding { .. } => ErrorKind::InvalidEncoding,
            DexError::StringTooLong { .. } => ErrorKind::StringTooLong,
        }
    }
}
