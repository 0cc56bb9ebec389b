//! Error types for archive stream parsing.

use thiserror::Error;

use crate::header::{HeaderError, PaxError};

/// Errors that stop the archive stream.
///
/// Every variant here means the parser no longer knows where the next header starts, or the
/// transport failed.  Header problems that still leave the stream position intact are reported
/// per member instead, as [`Member::Malformed`](super::Member::Malformed).
#[derive(Debug, Error)]
pub enum StreamError {
    /// I/O error from the underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A header field needed to find the next header couldn't be decoded.
    #[error("header error at offset {pos}: {source}")]
    Header {
        /// Offset of the header block in the stream.
        pos: u64,
        source: HeaderError,
    },

    /// PAX extended header data couldn't be parsed.
    #[error("PAX error at offset {pos}: {source}")]
    Pax {
        /// Offset of the extended header block in the stream.
        pos: u64,
        source: PaxError,
    },

    /// The declared size overflows when rounded up to the block size.
    #[error("invalid entry size: {0}")]
    InvalidSize(u64),

    /// The input ended inside a header, member data or padding.
    #[error("unexpected EOF at offset {pos}")]
    UnexpectedEof {
        /// Offset in the stream where the input ran out.
        pos: u64,
    },

    /// A path from a header or extension exceeds the configured maximum.
    #[error("path exceeds limit: {len} bytes > {limit} bytes")]
    PathTooLong { len: usize, limit: usize },

    /// An extension header's data exceeds the configured maximum.
    #[error("extension header exceeds limit: {size} bytes > {limit} bytes")]
    ExtensionTooLarge { size: u64, limit: u64 },

    /// Too many extension headers in a row without a member to apply them to.
    #[error("too many pending extension headers: {count} > {limit}")]
    TooManyPendingEntries { count: usize, limit: usize },

    /// Extension headers were followed by the end of the archive.
    #[error("extension headers without a following member")]
    OrphanedMetadata,
}

/// Result type for stream parsing operations.
pub type Result<T> = std::result::Result<T, StreamError>;
