//! Opening the archive input and undoing its compression.

use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use anyhow::{Context, Result};

/// Compression applied to the archive stream.
///
/// All decoders accept concatenated streams (as `cat a.tar.gz b.tar.gz` produces) and keep
/// reading until the input ends.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bzip2,
    Zstd,
}

impl Compression {
    /// Puts the matching decoder on top of `reader`.
    pub fn wrap<'a>(self, reader: impl Read + 'a) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }
}

/// Whether `path` names standard input.
#[must_use]
pub fn is_stdin(path: &Path) -> bool {
    path == Path::new("-") || path == Path::new("/dev/stdin")
}

/// Opens the archive input: standard input for `-` or `/dev/stdin`, otherwise a file.
pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_stdin(path) {
        return Ok(Box::new(io::stdin().lock()));
    }

    let file = File::open(path).with_context(|| format!("Opening input {}", path.display()))?;
    Ok(Box::new(file))
}
