//! Opening the triage output.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};

/// What to do when the output file already exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Refuse to touch an existing file.
    #[default]
    CreateNew,
    /// Add records after the existing content.
    Append,
    /// Truncate the existing file.
    Overwrite,
}

impl OutputMode {
    fn options(self) -> OpenOptions {
        let mut options = File::options();
        match self {
            OutputMode::CreateNew => options.write(true).create_new(true),
            OutputMode::Append => options.append(true).create(true),
            OutputMode::Overwrite => options.write(true).create(true).truncate(true),
        };
        options
    }
}

/// Whether `path` names standard output.
#[must_use]
pub fn is_stdout(path: &Path) -> bool {
    path == Path::new("-") || path == Path::new("/dev/stdout")
}

/// Opens the record sink: standard output for `-` or `/dev/stdout`, otherwise a file opened
/// according to `mode`.  The mode doesn't matter for standard output.
pub fn open_output(path: &Path, mode: OutputMode) -> Result<Box<dyn Write>> {
    if is_stdout(path) {
        return Ok(Box::new(io::stdout().lock()));
    }

    let file = mode
        .options()
        .open(path)
        .with_context(|| format!("Opening output {} ({mode:?})", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}
