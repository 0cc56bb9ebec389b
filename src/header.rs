//! Decoding of single 512-byte tar header blocks.
//!
//! A header block is viewed in place through [`HeaderBlock`], a zerocopy struct whose fields
//! follow the POSIX ustar layout.  Old-style (v7) and GNU headers share the first 257 bytes of
//! that layout, which is all the streaming parser needs beyond the ustar `prefix` field.
//!
//! | Offset | Size | Field     |
//! |--------|------|-----------|
//! | 0      | 100  | name      |
//! | 100    | 8    | mode      |
//! | 108    | 8    | uid       |
//! | 116    | 8    | gid       |
//! | 124    | 12   | size      |
//! | 136    | 12   | mtime     |
//! | 148    | 8    | checksum  |
//! | 156    | 1    | typeflag  |
//! | 157    | 100  | linkname  |
//! | 257    | 6    | magic     |
//! | 263    | 2    | version   |
//! | 265    | 32   | uname     |
//! | 297    | 32   | gname     |
//! | 329    | 8    | devmajor  |
//! | 337    | 8    | devminor  |
//! | 345    | 155  | prefix    |
//! | 500    | 12   | (padding) |

use std::fmt;

use thiserror::Error;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// The tar alignment unit.  Headers are exactly one block, member data is padded to a multiple.
pub const BLOCK_SIZE: usize = 512;

const USTAR_MAGIC: &[u8; 6] = b"ustar\0";
const USTAR_VERSION: &[u8; 2] = b"00";
const GNU_MAGIC: &[u8; 6] = b"ustar ";
const GNU_VERSION: &[u8; 2] = b" \0";

/// Errors found while decoding the fields of one header block.
#[derive(Debug, Error)]
pub enum HeaderError {
    /// A numeric field contains something other than octal digits or base-256 data.
    #[error("invalid numeric field: {0:?}")]
    InvalidNumeric(Vec<u8>),

    /// The stored checksum doesn't match the sum of the header bytes.
    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// The value found in the checksum field.
        stored: u64,
        /// The value computed from the block.
        computed: u64,
    },
}

/// Errors found while walking the records of a PAX extended header.
#[derive(Debug, Error)]
pub enum PaxError {
    /// A record doesn't have the `<len> <key>=<value>\n` shape.
    #[error("malformed PAX extension record")]
    Malformed,
}

/// The kind of object a tar member describes, from the `typeflag` byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// `'0'`, or `'\0'` in old archives.
    Regular,
    /// `'1'`
    Link,
    /// `'2'`
    Symlink,
    /// `'3'`
    Char,
    /// `'4'`
    Block,
    /// `'5'`
    Directory,
    /// `'6'`
    Fifo,
    /// `'7'`, stored like a regular file.
    Continuous,
    /// `'L'`: the data is the name of the next member.
    GnuLongName,
    /// `'K'`: the data is the link target of the next member.
    GnuLongLink,
    /// `'S'`
    GnuSparse,
    /// `'x'`: PAX records for the next member.
    XHeader,
    /// `'g'`: PAX records for the rest of the archive.
    XGlobalHeader,
    /// Anything else.
    Other(u8),
}

impl EntryType {
    /// Classifies a `typeflag` byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' | b'\0' => EntryType::Regular,
            b'1' => EntryType::Link,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::Char,
            b'4' => EntryType::Block,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::Continuous,
            b'L' => EntryType::GnuLongName,
            b'K' => EntryType::GnuLongLink,
            b'S' => EntryType::GnuSparse,
            b'x' => EntryType::XHeader,
            b'g' => EntryType::XGlobalHeader,
            other => EntryType::Other(other),
        }
    }

    /// Whether the member's data is plain file content.
    ///
    /// GNU sparse members are not: their data is the stored fragments, not the file as it reads
    /// back, so a digest of it wouldn't identify the file.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, EntryType::Regular | EntryType::Continuous)
    }
}

/// In-place view of one header block.
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct HeaderBlock {
    name: [u8; 100],
    _mode_uid_gid: [u8; 24],
    size: [u8; 12],
    _mtime: [u8; 12],
    checksum: [u8; 8],
    typeflag: u8,
    _linkname: [u8; 100],
    magic: [u8; 6],
    version: [u8; 2],
    _uname_gname: [u8; 64],
    _devmajor_devminor: [u8; 16],
    prefix: [u8; 155],
    _pad: [u8; 12],
}

impl HeaderBlock {
    /// Views a block buffer as a header.  This can't fail: the sizes match and the alignment is 1.
    #[must_use]
    pub fn from_block(block: &[u8; BLOCK_SIZE]) -> &HeaderBlock {
        zerocopy::transmute_ref!(block)
    }

    /// Whether every byte of the block is zero (the end-of-archive marker).
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    /// Whether the magic and version fields say POSIX ustar.
    #[must_use]
    pub fn is_ustar(&self) -> bool {
        self.magic == *USTAR_MAGIC && self.version == *USTAR_VERSION
    }

    /// Whether the magic and version fields say GNU tar.
    #[must_use]
    pub fn is_gnu(&self) -> bool {
        self.magic == *GNU_MAGIC && self.version == *GNU_VERSION
    }

    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.typeflag)
    }

    /// The declared length of the member's data, not counting padding.
    pub fn entry_size(&self) -> Result<u64, HeaderError> {
        parse_numeric(&self.size)
    }

    /// The raw `typeflag` byte.
    #[must_use]
    pub fn typeflag(&self) -> u8 {
        self.typeflag
    }

    /// The `name` field, up to the first NUL.
    #[must_use]
    pub fn name_bytes(&self) -> &[u8] {
        truncate_null(&self.name)
    }

    /// The ustar `prefix` field, or `None` for GNU and old-style headers (GNU reuses those
    /// bytes for other purposes).
    #[must_use]
    pub fn prefix(&self) -> Option<&[u8]> {
        self.is_ustar().then(|| truncate_null(&self.prefix))
    }

    /// The member path as stored in this block: `prefix/name` for ustar, else `name`.
    #[must_use]
    pub fn path_bytes(&self) -> Vec<u8> {
        match self.prefix() {
            Some(prefix) if !prefix.is_empty() => {
                let mut path = prefix.to_vec();
                path.push(b'/');
                path.extend_from_slice(self.name_bytes());
                path
            }
            _ => self.name_bytes().to_vec(),
        }
    }

    /// Checks the stored checksum against [`compute_checksum`](Self::compute_checksum), or
    /// against [`compute_signed_checksum`](Self::compute_signed_checksum) as some old writers
    /// stored it.
    pub fn verify_checksum(&self) -> Result<(), HeaderError> {
        let stored = parse_octal(&self.checksum)?;
        let computed = self.compute_checksum();
        if stored == computed || i64::try_from(stored) == Ok(self.compute_signed_checksum()) {
            Ok(())
        } else {
            Err(HeaderError::ChecksumMismatch { stored, computed })
        }
    }

    /// Unsigned sum of all bytes of the block, counting the checksum field as spaces.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        self.checksum_bytes().map(u64::from).sum()
    }

    /// Like [`compute_checksum`](Self::compute_checksum), with every byte taken as an `i8`.
    #[must_use]
    pub fn compute_signed_checksum(&self) -> i64 {
        self.checksum_bytes().map(|b| i64::from(b as i8)).sum()
    }

    /// The block's bytes with the checksum field replaced by spaces.
    fn checksum_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        let bytes = self.as_bytes();
        bytes[..148]
            .iter()
            .copied()
            .chain([b' '; 8])
            .chain(bytes[156..].iter().copied())
    }
}

impl fmt::Debug for HeaderBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderBlock")
            .field("path", &String::from_utf8_lossy(&self.path_bytes()))
            .field("entry_type", &self.entry_type())
            .field("size", &self.entry_size().ok())
            .field("is_ustar", &self.is_ustar())
            .field("is_gnu", &self.is_gnu())
            .finish()
    }
}

/// Parses an octal ASCII field: optional leading spaces, digits, then a space or NUL.  An empty
/// field is zero.
pub fn parse_octal(bytes: &[u8]) -> Result<u64, HeaderError> {
    let start = bytes.iter().position(|&b| b != b' ').unwrap_or(bytes.len());
    let end = bytes[start..]
        .iter()
        .position(|&b| b == b' ' || b == b'\0')
        .map_or(bytes.len(), |i| start + i);

    bytes[start..end].iter().try_fold(0u64, |value, &byte| {
        if !(b'0'..=b'7').contains(&byte) {
            return Err(HeaderError::InvalidNumeric(bytes.to_vec()));
        }
        value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(byte - b'0')))
            .ok_or_else(|| HeaderError::InvalidNumeric(bytes.to_vec()))
    })
}

/// Parses a numeric field that is either octal ASCII or, when the high bit of the first byte is
/// set, GNU base-256 (big-endian binary in the remaining bits).
pub fn parse_numeric(bytes: &[u8]) -> Result<u64, HeaderError> {
    match bytes.first() {
        Some(&first) if first & 0x80 != 0 => {
            bytes
                .iter()
                .enumerate()
                .try_fold(0u64, |value, (i, &byte)| {
                    let byte = if i == 0 { byte & 0x7f } else { byte };
                    value
                        .checked_mul(256)
                        .and_then(|v| v.checked_add(u64::from(byte)))
                        .ok_or_else(|| HeaderError::InvalidNumeric(bytes.to_vec()))
                })
        }
        _ => parse_octal(bytes),
    }
}

/// Returns the bytes before the first NUL, or all of them.
#[must_use]
pub fn truncate_null(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}

/// Iterator over the `<len> <key>=<value>\n` records of a PAX extended header.
#[derive(Debug)]
pub struct PaxRecords<'a> {
    data: &'a [u8],
}

impl<'a> PaxRecords<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for PaxRecords<'a> {
    type Item = Result<(&'a [u8], &'a [u8]), PaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        let data = self.data;

        // some writers pad the extended header data with NULs
        if data.iter().all(|&b| b == 0) {
            return None;
        }

        let record = (|| {
            let space = data.iter().position(|&b| b == b' ')?;
            let len: usize = std::str::from_utf8(&data[..space]).ok()?.parse().ok()?;
            if len > data.len() || len < space + 2 || data[len - 1] != b'\n' {
                return None;
            }
            let kv = &data[space + 1..len - 1];
            let eq = kv.iter().position(|&b| b == b'=')?;
            Some((len, &kv[..eq], &kv[eq + 1..]))
        })();

        match record {
            Some((len, key, value)) => {
                self.data = &data[len..];
                Some(Ok((key, value)))
            }
            None => {
                self.data = &[];
                Some(Err(PaxError::Malformed))
            }
        }
    }
}
