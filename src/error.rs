use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SortError>;

/// Errors surfaced by the sorter, its run files, and the merge cursor.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// A run file failed validation: CRC mismatch, truncated frame, or a
    /// nonsensical length prefix. Run files are written by this engine, so
    /// this indicates on-disk corruption or external tampering.
    #[error("bad run stream: {0}")]
    BadStream(&'static str),

    /// An underlying file or compression stream error.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Cancellation was observed while finalizing.
    #[error("sort canceled")]
    Canceled,

    /// The cursor was used after `close`.
    #[error("cursor is closed")]
    Closed,
}

impl SortError {
    pub fn is_bad_stream(&self) -> bool {
        matches!(self, Self::BadStream(_))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}
