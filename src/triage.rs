//! The triage record: one line of output per regular file.
//!
//! ```text
//! <size>\t<hex digest of first 512 bytes>\t<hex digest of everything>\t<name>
//! ```
//!
//! The name is written exactly as it appears in the archive.  Tabs or newlines inside it are not
//! escaped, which is why consumers that care should ask for NUL delimiters.

use std::fmt;

/// Size, both digests and name of one regular-file member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageRecord {
    pub size: u64,
    pub first_digest: String,
    pub full_digest: String,
    pub name: Vec<u8>,
}

impl TriageRecord {
    /// The record's bytes, without any trailing delimiter.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            20 + self.first_digest.len() + self.full_digest.len() + self.name.len() + 3,
        );
        self.write_to(&mut out);
        out
    }

    /// Appends the record's bytes to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.size.to_string().as_bytes());
        out.push(b'\t');
        out.extend_from_slice(self.first_digest.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(self.full_digest.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(&self.name);
    }
}

/// Renders the name lossily; use [`TriageRecord::to_bytes`] for output.
impl fmt::Display for TriageRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.size,
            self.first_digest,
            self.full_digest,
            String::from_utf8_lossy(&self.name)
        )
    }
}

#[cfg(test)]
mod test {
    use similar_asserts::assert_eq;

    use super::*;

    fn record(name: &[u8]) -> TriageRecord {
        TriageRecord {
            size: 5,
            first_digest: "aa".into(),
            full_digest: "bb".into(),
            name: name.to_vec(),
        }
    }

    #[test]
    fn test_format() {
        assert_eq!(record(b"a.txt").to_bytes(), b"5\taa\tbb\ta.txt".to_vec());
        assert_eq!(record(b"a.txt").to_string(), "5\taa\tbb\ta.txt");
    }

    #[test]
    fn test_name_is_not_escaped() {
        assert_eq!(
            record(b"we\tird\nname").to_bytes(),
            b"5\taa\tbb\twe\tird\nname".to_vec()
        );
        assert_eq!(record(b"\xff").to_bytes(), b"5\taa\tbb\t\xff".to_vec());
    }

    #[test]
    fn test_write_to_appends() {
        let mut out = b"prefix:".to_vec();
        record(b"x").write_to(&mut out);
        out.push(0);
        assert_eq!(out, b"prefix:5\taa\tbb\tx\0".to_vec());
    }
}
