//! Tolerance switches and resource limits for archive stream parsing.

/// How forgiving the parser is about the end of the archive, and how much memory extension
/// headers may claim.
///
/// ```
/// use sumpipe::stream::ParseOptions;
///
/// // read concatenated archives through to the end of input
/// let options = ParseOptions {
///     ignore_zeros: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Skip all-zero blocks instead of treating the first one as the end of the archive.
    ///
    /// Default: `false`.  A single zero block ends the archive, so a producer that never sends
    /// the second terminator block doesn't leave the reader waiting.
    pub ignore_zeros: bool,

    /// Fail with [`StreamError::UnexpectedEof`] when the input ends partway through a header
    /// block.
    ///
    /// Default: `false`, a partial header is logged and taken as the end of the archive.
    ///
    /// [`StreamError::UnexpectedEof`]: super::StreamError::UnexpectedEof
    pub strict_eof: bool,

    /// Maximum member path length in bytes, after extensions are applied.
    ///
    /// Default: 4096 bytes (Linux PATH_MAX).
    pub max_path_len: usize,

    /// Maximum data size of a single PAX extended header.
    ///
    /// Default: 1 MiB.
    pub max_pax_size: u64,

    /// Maximum data size of a GNU long name or long link header.
    ///
    /// Default: 4096 bytes.
    pub max_gnu_long_size: u64,

    /// Maximum number of extension headers in a row before a real member.
    ///
    /// Default: 16.
    pub max_pending_entries: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            ignore_zeros: false,
            strict_eof: false,
            max_path_len: 4096,
            max_pax_size: 1024 * 1024, // 1 MiB
            max_gnu_long_size: 4096,
            max_pending_entries: 16,
        }
    }
}
