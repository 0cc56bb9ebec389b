//! Streaming triage sums for tar archives.
//!
//! This crate reads a tar stream front to back, without seeking and without holding whole
//! members in memory, and produces one "triage" record per regular file:
//!
//! ```text
//! <size>\t<digest of first 512 bytes>\t<digest of whole file>\t<name>
//! ```
//!
//! The archive can be passed through unchanged to another consumer while it is being summed
//! (see [`tee`]), and gzip, bzip2 or zstd compressed input is decoded on the fly (see
//! [`input`]).
//!
//! ```
//! use sumpipe::pipeline::{Pipeline, PipelineConfig};
//!
//! let mut records = Vec::new();
//! let counters = Pipeline::new(PipelineConfig::default())
//!     .run(std::io::empty(), &mut records)
//!     .unwrap();
//! assert_eq!(counters.files_seen, 0);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_debug_implementations)]

pub mod digest;
pub mod header;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod stream;
pub mod tee;
pub mod triage;

mod util;
