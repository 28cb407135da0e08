use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Total order over opaque byte records.
///
/// Implementations must be a total order; the engine performs no
/// validation. Any `Fn(&[u8], &[u8]) -> Ordering` closure qualifies.
pub trait Comparer: Send + Sync {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;
}

impl<F> Comparer for F
where
    F: Fn(&[u8], &[u8]) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self(a, b)
    }
}

/// Bytewise lexicographic order, the default.
pub(crate) fn lexicographic() -> Arc<dyn Comparer> {
    Arc::new(|a: &[u8], b: &[u8]| a.cmp(b))
}

/// Compression applied to whole run files: the concatenated record frames
/// are wrapped in a single compressed stream, never per record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Zstd,
}

const ONE_MIB: usize = 1024 * 1024;

/// User-facing options with defaults and builder chaining.
#[derive(Clone)]
pub struct SortOptions {
    /// Directory for spill files. `None` means the system temp dir.
    pub temp_dir: Option<PathBuf>,
    /// Sort order. `None` means bytewise lexicographic.
    pub comparer: Option<Arc<dyn Comparer>>,
    /// Compression for run files.
    pub compression: Compression,
    /// Max run files open simultaneously during any one merge (the fan-in
    /// plus the merge output). Values below 2 fall back to 100.
    pub max_open_files: usize,
    /// In-memory spill threshold in bytes. Zero falls back to 64 MiB and
    /// anything below 1 MiB is raised to 1 MiB.
    pub max_mem_buffer: usize,
    /// Read buffer capacity per open run file.
    pub read_buffer_bytes: usize,
    /// Write buffer capacity per run file being written.
    pub write_buffer_bytes: usize,
    /// Group merges dispatched concurrently within one compaction round.
    /// Effective parallelism is derived from `max_open_files`: the merges
    /// in flight never hold more than the descriptor budget between them,
    /// with rounds using smaller groups to make room for concurrency.
    pub compaction_threads: usize,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            temp_dir: None,
            comparer: None,
            compression: Compression::None,
            max_open_files: 100,
            max_mem_buffer: 64 * ONE_MIB,
            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
            compaction_threads: 1,
        }
    }
}

impl SortOptions {
    pub fn with_temp_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.temp_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_comparer(mut self, comparer: impl Comparer + 'static) -> Self {
        self.comparer = Some(Arc::new(comparer));
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_max_open_files(mut self, n: usize) -> Self {
        self.max_open_files = n;
        self
    }

    pub fn with_max_mem_buffer(mut self, bytes: usize) -> Self {
        self.max_mem_buffer = bytes;
        self
    }

    // IO buffers tuning
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes;
        self.write_buffer_bytes = write_bytes;
        self
    }

    pub fn with_compaction_threads(mut self, n: usize) -> Self {
        self.compaction_threads = n;
        self
    }

    /// Snap out-of-range values to their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.max_open_files < 2 {
            self.max_open_files = 100;
        }
        if self.max_mem_buffer < 1 {
            self.max_mem_buffer = 64 * ONE_MIB;
        } else if self.max_mem_buffer < ONE_MIB {
            self.max_mem_buffer = ONE_MIB;
        }
        self.read_buffer_bytes = self.read_buffer_bytes.max(8 * 1024);
        self.write_buffer_bytes = self.write_buffer_bytes.max(8 * 1024);
        self.compaction_threads = self.compaction_threads.max(1);
        self
    }
}
