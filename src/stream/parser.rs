//! Forward-only archive stream parser.

use std::io::{self, ErrorKind, Read};

use log::{debug, warn};

use crate::{
    header::{truncate_null, EntryType, HeaderBlock, PaxError, PaxRecords, BLOCK_SIZE},
    util::read_up_to,
};

use super::{
    entry::{Member, MemberDescriptor},
    error::{Result, StreamError},
    options::ParseOptions,
    payload::PayloadReader,
};

/// Extension header data waiting for the member it applies to.
#[derive(Debug, Default)]
struct PendingMetadata {
    long_name: Option<Vec<u8>>,
    pax_path: Option<Vec<u8>>,
    pax_size: Option<u64>,
    count: usize,
}

impl PendingMetadata {
    fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Reads tar members one at a time from a reader that can only go forward.
///
/// The parser never holds more than one header block and, transiently, the data of a single
/// extension header.  It tracks how many bytes it has consumed so that member data plus padding
/// always ends on a block boundary.
///
/// # Consuming member data
///
/// A [`Member::File`] comes with a [`PayloadReader`] that borrows the parser.  Whatever part of
/// the data the caller doesn't read is skipped on the next call to
/// [`next_member`](Self::next_member), or right away with [`PayloadReader::finish`].
///
/// ```
/// use std::io::Read;
/// use sumpipe::stream::{ArchiveStream, Member, ParseOptions};
///
/// # fn main() -> sumpipe::stream::Result<()> {
/// let mut stream = ArchiveStream::new(std::io::empty(), ParseOptions::default());
/// while let Some(member) = stream.next_member()? {
///     if let Member::File(descriptor, mut payload) = member {
///         let mut content = Vec::new();
///         payload.read_to_end(&mut content)?;
///         println!("{} {}", descriptor.name_lossy(), content.len());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArchiveStream<R> {
    reader: R,
    options: ParseOptions,
    block: [u8; BLOCK_SIZE],
    /// Bytes consumed from the reader so far.
    pos: u64,
    /// Unread data of the current member.
    remaining: u64,
    /// Padding after the current member's data.
    padding: u64,
    /// Set at the end of the archive, or once skipping has failed.
    done: bool,
}

impl<R: Read> ArchiveStream<R> {
    pub fn new(reader: R, options: ParseOptions) -> Self {
        Self {
            reader,
            options,
            block: [0u8; BLOCK_SIZE],
            pos: 0,
            remaining: 0,
            padding: 0,
            done: false,
        }
    }

    /// Number of bytes consumed from the underlying reader.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Advances to the next member.
    ///
    /// Returns `Ok(None)` at the end of the archive: a zero block (unless
    /// [`ignore_zeros`](ParseOptions::ignore_zeros) is set), EOF at a block boundary, or EOF
    /// inside a header block (unless [`strict_eof`](ParseOptions::strict_eof) is set).
    ///
    /// GNU long name/link and PAX headers are folded into the member that follows them and are
    /// never returned themselves.
    pub fn next_member(&mut self) -> Result<Option<Member<'_, R>>> {
        self.skip_current()?;
        if self.done {
            return Ok(None);
        }

        let mut pending = PendingMetadata::default();

        loop {
            if pending.count > self.options.max_pending_entries {
                return Err(StreamError::TooManyPendingEntries {
                    count: pending.count,
                    limit: self.options.max_pending_entries,
                });
            }

            let offset = self.pos;
            if !self.read_block()? {
                self.finish_archive(&pending)?;
                return Ok(None);
            }

            let header = HeaderBlock::from_block(&self.block);
            if header.is_zero() {
                if self.options.ignore_zeros {
                    continue;
                }
                self.finish_archive(&pending)?;
                return Ok(None);
            }

            // The size is what locates the next header, so a bad size field loses our place in
            // the stream.  Anything else wrong with the block only costs this one member.
            let size = header
                .entry_size()
                .map_err(|source| StreamError::Header {
                    pos: offset,
                    source,
                })?;

            if let Err(error) = header.verify_checksum() {
                debug!("bad header at offset {offset}: {error}");
                if !pending.is_empty() {
                    debug!(
                        "dropping {} extension header(s) for the bad header at offset {offset}",
                        pending.count
                    );
                }
                // a PAX size still says where this member's data ends
                let padded = padded_size(pending.pax_size.unwrap_or(size))?;
                self.skip_bytes(padded)?;
                return Ok(Some(Member::Malformed { offset, error }));
            }

            let mut entry_type = header.entry_type();
            match entry_type {
                EntryType::GnuLongName => {
                    let data = self.read_extension(size, self.options.max_gnu_long_size)?;
                    pending.long_name = Some(truncate_null(&data).to_vec());
                    pending.count += 1;
                    continue;
                }
                EntryType::GnuLongLink => {
                    // link targets aren't part of a member descriptor
                    if size > self.options.max_gnu_long_size {
                        return Err(StreamError::ExtensionTooLarge {
                            size,
                            limit: self.options.max_gnu_long_size,
                        });
                    }
                    self.skip_bytes(padded_size(size)?)?;
                    pending.count += 1;
                    continue;
                }
                EntryType::XHeader => {
                    let data = self.read_extension(size, self.options.max_pax_size)?;
                    apply_pax(&data, offset, &mut pending)?;
                    pending.count += 1;
                    continue;
                }
                EntryType::XGlobalHeader => {
                    debug!("skipping PAX global header at offset {offset}");
                    self.skip_bytes(padded_size(size)?)?;
                    continue;
                }
                _ => {}
            }

            let name = match (pending.pax_path.take(), pending.long_name.take()) {
                (Some(path), _) | (None, Some(path)) => path,
                (None, None) => header.path_bytes(),
            };
            if name.len() > self.options.max_path_len {
                return Err(StreamError::PathTooLong {
                    len: name.len(),
                    limit: self.options.max_path_len,
                });
            }

            // old-style archives mark directories only by a trailing slash
            if header.typeflag() == b'\0' && name.ends_with(b"/") {
                entry_type = EntryType::Directory;
            }

            let size = pending.pax_size.unwrap_or(size);
            let padded = padded_size(size)?;
            let descriptor = MemberDescriptor::new(name, size, entry_type, offset);
            debug!("{entry_type:?} member at offset {offset}: {descriptor:?}");

            self.remaining = size;
            self.padding = padded - size;

            if entry_type.is_file() {
                return Ok(Some(Member::File(descriptor, PayloadReader::new(self))));
            }

            self.skip_current()?;
            return Ok(Some(Member::Skipped(descriptor)));
        }
    }

    /// Unread data bytes of the current member.
    pub(super) fn remaining_data(&self) -> u64 {
        self.remaining
    }

    /// Reads data of the current member, never past its declared size.
    pub(super) fn read_data(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = self.reader.read(&mut buf[..want])?;
        if n == 0 {
            return Err(io::Error::new(
                ErrorKind::UnexpectedEof,
                StreamError::UnexpectedEof { pos: self.pos },
            ));
        }

        self.remaining -= n as u64;
        self.pos += n as u64;
        Ok(n)
    }

    /// Discards the rest of the current member's data and its padding.
    pub(super) fn skip_current(&mut self) -> Result<()> {
        let len = self.remaining + self.padding;
        self.remaining = 0;
        self.padding = 0;

        if let Err(err) = self.skip_bytes(len) {
            // we no longer know where the next header is
            self.done = true;
            return Err(err);
        }
        Ok(())
    }

    fn finish_archive(&mut self, pending: &PendingMetadata) -> Result<()> {
        self.done = true;
        if pending.is_empty() {
            Ok(())
        } else {
            Err(StreamError::OrphanedMetadata)
        }
    }

    /// Reads the next header block.  Returns `false` at the end of the input.
    fn read_block(&mut self) -> Result<bool> {
        match read_up_to(&mut self.reader, &mut self.block)? {
            BLOCK_SIZE => {
                self.pos += BLOCK_SIZE as u64;
                Ok(true)
            }
            0 => Ok(false),
            n if self.options.strict_eof => Err(StreamError::UnexpectedEof {
                pos: self.pos + n as u64,
            }),
            n => {
                warn!(
                    "input ends {n} bytes into a header block at offset {}, treating it as the end of the archive",
                    self.pos
                );
                self.pos += n as u64;
                Ok(false)
            }
        }
    }

    /// Reads the data of an extension header and skips its padding.
    fn read_extension(&mut self, size: u64, limit: u64) -> Result<Vec<u8>> {
        if size > limit {
            return Err(StreamError::ExtensionTooLarge { size, limit });
        }

        let mut data = vec![0u8; size as usize];
        let got = read_up_to(&mut self.reader, &mut data)?;
        self.pos += got as u64;
        if got < data.len() {
            return Err(StreamError::UnexpectedEof { pos: self.pos });
        }

        self.skip_bytes(padded_size(size)? - size)?;
        Ok(data)
    }

    /// Reads and discards `len` bytes.
    fn skip_bytes(&mut self, len: u64) -> Result<()> {
        let mut remaining = len;
        let mut buf = [0u8; 8192];

        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            match self.reader.read(&mut buf[..want]) {
                Ok(0) => return Err(StreamError::UnexpectedEof { pos: self.pos }),
                Ok(n) => {
                    self.pos += n as u64;
                    remaining -= n as u64;
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// `size` rounded up to the block size.
fn padded_size(size: u64) -> Result<u64> {
    size.checked_next_multiple_of(BLOCK_SIZE as u64)
        .ok_or(StreamError::InvalidSize(size))
}

/// Picks the keys that change a member descriptor out of PAX extended header data.
fn apply_pax(data: &[u8], offset: u64, pending: &mut PendingMetadata) -> Result<()> {
    let malformed = |source| StreamError::Pax {
        pos: offset,
        source,
    };

    for record in PaxRecords::new(data) {
        let (key, value) = record.map_err(malformed)?;
        match key {
            b"path" => pending.pax_path = Some(value.to_vec()),
            b"size" => {
                let size = std::str::from_utf8(value)
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| malformed(PaxError::Malformed))?;
                pending.pax_size = Some(size);
            }
            _ => {}
        }
    }
    Ok(())
}
