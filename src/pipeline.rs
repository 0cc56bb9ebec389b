//! Drives an archive stream and writes one triage record per regular file.

use std::{
    fmt,
    io::{self, Read, Write},
};

use anyhow::{Context, Result};
use indicatif::HumanBytes;
use log::{debug, warn};

use crate::{
    digest::{DigestAccumulator, HashAlgorithm},
    header::BLOCK_SIZE,
    stream::{ArchiveStream, Member, MemberDescriptor, ParseOptions},
    triage::TriageRecord,
    util::read_up_to,
};

/// How many leading bytes of each file go into the first digest.
pub const FIRST_CHUNK_SIZE: usize = BLOCK_SIZE;

/// What follows each record in the output.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Delimiter {
    #[default]
    Newline,
    /// For names that might contain newlines.
    Null,
}

impl Delimiter {
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            Delimiter::Newline => b'\n',
            Delimiter::Null => b'\0',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub algorithm: HashAlgorithm,
    pub delimiter: Delimiter,
    /// Size of the buffer member data is read through.  Never less than one block.
    pub chunk_size: usize,
    pub parse: ParseOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            delimiter: Delimiter::default(),
            chunk_size: 64 * 1024,
            parse: ParseOptions::default(),
        }
    }
}

/// Totals for one run over an archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineCounters {
    /// Regular files that got a record.
    pub files_seen: u64,
    /// Sum of those files' sizes.
    pub bytes_seen: u64,
    /// Directories, links and other non-file members.
    pub files_skipped: u64,
    /// Members whose header didn't decode.
    pub malformed: u64,
}

impl fmt::Display for PipelineCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed {} files {}.",
            self.files_seen,
            HumanBytes(self.bytes_seen)
        )
    }
}

/// Reads an archive and sums its regular files.
///
/// A pipeline holds no state between runs; every call to [`run`](Self::run) or
/// [`drain`](Self::drain) starts from zeroed counters and returns them.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Reads the archive from `reader` and writes a record for each regular file to `sink`.
    ///
    /// Records are only written once both digests are complete, so a fatal error midway through
    /// a member never leaves a partial record behind.  The sink is flushed before returning.
    pub fn run(&self, reader: impl Read, mut sink: impl Write) -> Result<PipelineCounters> {
        let mut stream = ArchiveStream::new(reader, self.config.parse.clone());
        let mut counters = PipelineCounters::default();
        let mut buf = vec![0u8; self.config.chunk_size.max(BLOCK_SIZE)];
        let mut line = Vec::new();

        while let Some(member) = stream.next_member().context("Reading archive")? {
            match member {
                Member::File(descriptor, mut payload) => {
                    let record = self
                        .sum_payload(&descriptor, &mut payload, &mut buf)
                        .with_context(|| format!("Reading {}", descriptor.name_lossy()))?;
                    payload.finish().context("Skipping member padding")?;

                    line.clear();
                    record.write_to(&mut line);
                    line.push(self.config.delimiter.byte());
                    sink.write_all(&line).context("Writing triage record")?;

                    counters.files_seen += 1;
                    counters.bytes_seen += record.size;
                }
                Member::Skipped(descriptor) => {
                    debug!(
                        "skipping {:?} member {}",
                        descriptor.entry_type(),
                        descriptor.name_lossy()
                    );
                    counters.files_skipped += 1;
                }
                Member::Malformed { offset, error } => {
                    warn!("Skipping member with bad header at offset {offset}: {error}");
                    counters.malformed += 1;
                }
            }
        }

        sink.flush().context("Flushing triage output")?;
        Ok(counters)
    }

    /// Reads the archive through without hashing or writing anything.
    ///
    /// Counts are collected the same way as [`run`](Self::run).  Useful for measuring how fast
    /// the input side alone can go.
    pub fn drain(&self, reader: impl Read) -> Result<PipelineCounters> {
        let mut stream = ArchiveStream::new(reader, self.config.parse.clone());
        let mut counters = PipelineCounters::default();

        while let Some(member) = stream.next_member().context("Reading archive")? {
            match member {
                Member::File(descriptor, payload) => {
                    payload
                        .finish()
                        .with_context(|| format!("Reading {}", descriptor.name_lossy()))?;
                    counters.files_seen += 1;
                    counters.bytes_seen += descriptor.size();
                }
                Member::Skipped(_) => counters.files_skipped += 1,
                Member::Malformed { offset, error } => {
                    warn!("Skipping member with bad header at offset {offset}: {error}");
                    counters.malformed += 1;
                }
            }
        }

        Ok(counters)
    }

    /// Feeds a member's data through both digests.
    fn sum_payload(
        &self,
        descriptor: &MemberDescriptor,
        payload: &mut impl Read,
        buf: &mut [u8],
    ) -> io::Result<TriageRecord> {
        let mut first = DigestAccumulator::new(self.config.algorithm);
        let mut full = DigestAccumulator::new(self.config.algorithm);

        let mut n = read_up_to(payload, &mut buf[..FIRST_CHUNK_SIZE])?;
        first.update(&buf[..n]);

        let mut size = 0u64;
        while n > 0 {
            full.update(&buf[..n]);
            size += n as u64;
            n = read_up_to(payload, buf)?;
        }
        debug_assert_eq!(size, descriptor.size());

        Ok(TriageRecord {
            size: descriptor.size(),
            first_digest: first.finalize(),
            full_digest: full.finalize(),
            name: descriptor.name().to_vec(),
        })
    }
}
