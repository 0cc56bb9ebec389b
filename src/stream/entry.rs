//! Members yielded by the archive stream.

use std::borrow::Cow;

use crate::header::{EntryType, HeaderError, BLOCK_SIZE};

use super::payload::PayloadReader;

/// One archive member, decoded from its header block and any extension headers before it.
///
/// The name is kept as the raw bytes from the archive.  Tar doesn't promise any encoding, and
/// the bytes go back out unchanged in the triage record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    name: Vec<u8>,
    size: u64,
    entry_type: EntryType,
    offset: u64,
}

impl MemberDescriptor {
    pub(crate) fn new(name: Vec<u8>, size: u64, entry_type: EntryType, offset: u64) -> Self {
        Self {
            name,
            size,
            entry_type,
            offset,
        }
    }

    /// The member path as stored.
    ///
    /// Priority: PAX `path` > GNU long name > ustar `prefix` + `name`.
    #[must_use]
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// The name as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Declared data length in bytes (PAX `size` overrides the header).
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Data length rounded up to the block size: the bytes between this header and the next.
    #[must_use]
    pub fn padded_size(&self) -> u64 {
        self.size.next_multiple_of(BLOCK_SIZE as u64)
    }

    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Whether the member's data is file content that gets summed.
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.entry_type.is_file()
    }

    /// Stream offset of the member's header block.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// One step of the archive stream.
#[derive(Debug)]
pub enum Member<'a, R> {
    /// A regular file.  Its data is read through the payload reader, which has to be used up or
    /// dropped before the stream can move on.
    File(MemberDescriptor, PayloadReader<'a, R>),

    /// Anything else (directory, link, device, ...).  The data region has already been skipped.
    Skipped(MemberDescriptor),

    /// A header that failed to decode but still declared a usable size.  Its data region has
    /// been skipped and the stream is positioned at the next header.
    Malformed {
        /// Offset of the bad header block.
        offset: u64,
        error: HeaderError,
    },
}
