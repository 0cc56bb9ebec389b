//! Bounded reader over one member's data.

use std::io::{self, Read};

use super::{error::Result, parser::ArchiveStream};

/// Reads the data of a single regular-file member.
///
/// Never returns more than the member's declared size, and reports `Ok(0)` once that much has
/// been read.  If the underlying input ends first, `read` fails with
/// [`ErrorKind::UnexpectedEof`](io::ErrorKind::UnexpectedEof).
///
/// Dropping the reader early is allowed: the rest of the data and the padding are skipped when
/// the stream advances.
#[derive(Debug)]
pub struct PayloadReader<'a, R> {
    stream: &'a mut ArchiveStream<R>,
}

impl<'a, R: Read> PayloadReader<'a, R> {
    pub(super) fn new(stream: &'a mut ArchiveStream<R>) -> Self {
        Self { stream }
    }

    /// Data bytes not yet read.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.stream.remaining_data()
    }

    /// Skips whatever data is left plus the padding, leaving the stream at the next header.
    pub fn finish(self) -> Result<()> {
        self.stream.skip_current()
    }
}

impl<R: Read> Read for PayloadReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read_data(buf)
    }
}
