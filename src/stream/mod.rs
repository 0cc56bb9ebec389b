//! Streaming tar member iteration over a forward-only reader.
//!
//! [`ArchiveStream`] reads one header block at a time and hands out each member in turn:
//!
//! - regular files come with a [`PayloadReader`] bounded to the member's declared size
//! - directories, links, devices and other non-file members have their data skipped
//! - headers that fail their checksum are reported as [`Member::Malformed`] and skipped, as long
//!   as their size field still says where the next header is
//!
//! GNU long name/link and PAX extended headers are applied to the member that follows them.
//!
//! # Memory
//!
//! Nothing is buffered beyond one header block and, for extension headers, their data (bounded
//! by [`ParseOptions`]).  Member data is only ever read in whatever chunks the caller asks for.
//!
//! # Example
//!
//! ```no_run
//! use std::io::{self, Read};
//! use sumpipe::stream::{ArchiveStream, Member, ParseOptions};
//!
//! let mut stream = ArchiveStream::new(io::stdin().lock(), ParseOptions::default());
//!
//! while let Some(member) = stream.next_member().unwrap() {
//!     match member {
//!         Member::File(descriptor, mut payload) => {
//!             let copied = io::copy(&mut payload, &mut io::sink()).unwrap();
//!             assert_eq!(copied, descriptor.size());
//!         }
//!         Member::Skipped(descriptor) => println!("skipped {}", descriptor.name_lossy()),
//!         Member::Malformed { offset, error } => eprintln!("bad header at {offset}: {error}"),
//!     }
//! }
//! ```

mod entry;
mod error;
mod options;
mod parser;
mod payload;

pub use entry::{Member, MemberDescriptor};
pub use error::{Result, StreamError};
pub use options::ParseOptions;
pub use parser::ArchiveStream;
pub use payload::PayloadReader;
