//! Mirror everything read from a reader into a writer.

use std::io::{self, Read, Write};

/// A reader that copies every byte it returns to a second sink.
///
/// Bytes reach the sink in the order they are read and before the caller sees them.  If writing
/// to the sink fails, so does the read.  This composes with other readers in either order: wrap
/// a decompressor to pass along decompressed data, or put the decompressor on top to pass along
/// the original compressed bytes.
///
/// ```
/// use std::io::Read;
/// use sumpipe::tee::TeeReader;
///
/// let mut tee = TeeReader::new(&b"some bytes"[..], Vec::new());
/// let mut seen = String::new();
/// tee.read_to_string(&mut seen).unwrap();
///
/// let (_, copy) = tee.into_inner();
/// assert_eq!(copy, b"some bytes");
/// ```
#[derive(Debug)]
pub struct TeeReader<R, W> {
    reader: R,
    sink: W,
}

impl<R: Read, W: Write> TeeReader<R, W> {
    pub fn new(reader: R, sink: W) -> Self {
        Self { reader, sink }
    }

    pub fn get_ref(&self) -> (&R, &W) {
        (&self.reader, &self.sink)
    }

    /// Flushes the sink.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.sink)
    }
}

impl<R: Read, W: Write> Read for TeeReader<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        self.sink.write_all(&buf[..n])?;
        Ok(n)
    }
}
