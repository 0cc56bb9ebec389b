//! Incremental content digests.
//!
//! Only the SHA-2 family is offered.  The names match the ones Python's `hashlib` uses, which is
//! what existing triage files were produced with.

use std::{fmt, str::FromStr};

use sha2::{digest::DynDigest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use thiserror::Error;

/// Returned when a hash algorithm name isn't one of [`HashAlgorithm::ALL`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported hash algorithm {0:?}")]
pub struct UnsupportedAlgorithm(pub String);

/// A hash algorithm that can be used for triage digests.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum HashAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
    #[value(name = "sha512_224")]
    Sha512_224,
    #[value(name = "sha512_256")]
    Sha512_256,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 6] = [
        HashAlgorithm::Sha224,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha384,
        HashAlgorithm::Sha512,
        HashAlgorithm::Sha512_224,
        HashAlgorithm::Sha512_256,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha224 => "sha224",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Sha512_224 => "sha512_224",
            HashAlgorithm::Sha512_256 => "sha512_256",
        }
    }

    /// Digest length in bytes (the hex form is twice as long).
    #[must_use]
    pub const fn output_size(self) -> usize {
        match self {
            HashAlgorithm::Sha224 | HashAlgorithm::Sha512_224 => 28,
            HashAlgorithm::Sha256 | HashAlgorithm::Sha512_256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            HashAlgorithm::Sha224 => Box::new(Sha224::default()),
            HashAlgorithm::Sha256 => Box::new(Sha256::default()),
            HashAlgorithm::Sha384 => Box::new(Sha384::default()),
            HashAlgorithm::Sha512 => Box::new(Sha512::default()),
            HashAlgorithm::Sha512_224 => Box::new(Sha512_224::default()),
            HashAlgorithm::Sha512_256 => Box::new(Sha512_256::default()),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = UnsupportedAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        HashAlgorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == lower)
            .ok_or_else(|| UnsupportedAlgorithm(s.to_string()))
    }
}

/// Running hash state for one purpose on one member.
///
/// [`finalize`](Self::finalize) consumes the accumulator, so a digest can only be taken once.
pub struct DigestAccumulator {
    algorithm: HashAlgorithm,
    state: Box<dyn DynDigest>,
}

impl DigestAccumulator {
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            state: algorithm.hasher(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Lowercase hex digest of everything fed in so far.
    #[must_use]
    pub fn finalize(self) -> String {
        hex::encode(self.state.finalize())
    }
}

impl fmt::Debug for DigestAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAccumulator")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
