use std::io::{ErrorKind, Read, Result};

/// Reads until the buffer is full or the reader reaches EOF, and returns how many bytes were
/// read.
///
/// Unlike a single `read()` call, short reads (as pipes and decompressors produce) are retried,
/// and so is EINTR.  A result smaller than `buf.len()` therefore always means EOF, and `Ok(0)`
/// means EOF before anything was read.
pub(crate) fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}
