use crate::buffer::RecordBuffer;
use crate::cancel::CancelToken;
use crate::error::{Result, SortError};
use crate::fs_util::remove_file_quiet;
use crate::merge::MergeCursor;
use crate::options::{lexicographic, Comparer, Compression, SortOptions};
use crate::run::RunWriter;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bounded-memory sorter for a stream of opaque byte records.
///
/// Records are buffered in memory up to `max_mem_buffer`, spilled as
/// sorted run files, compacted generationally until the survivors fit one
/// merge's fan-in, and streamed back through a [`MergeCursor`].
///
/// Not safe for concurrent mutation: drive `append` and `sort` from a
/// single flow, and drain the returned cursor from a single consumer.
/// Temp files belong to this instance; `close` (or drop) removes them.
pub struct Sorter {
    opt: SortOptions,
    comparer: Arc<dyn Comparer>,
    temp_dir: PathBuf,
    buf: RecordBuffer,
    run_files: Vec<PathBuf>,
}

impl Sorter {
    /// Create a sorter. Out-of-range option values snap to their defaults.
    pub fn new(options: SortOptions) -> Self {
        let opt = options.normalized();
        let comparer = opt.comparer.clone().unwrap_or_else(lexicographic);
        let temp_dir = opt.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
        Self {
            opt,
            comparer,
            temp_dir,
            buf: RecordBuffer::new(),
            run_files: Vec::new(),
        }
    }

    /// Buffer one record, spilling the current buffer first if the record
    /// would push it past `max_mem_buffer`. A single record larger than
    /// the whole budget is still accepted into an empty buffer and spilled
    /// as a one-record run later.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        let size = self.buf.bytes();
        if size > 0 && size + data.len() > self.opt.max_mem_buffer {
            self.spill()?;
        }
        self.buf.push(data);
        Ok(())
    }

    /// Finalize: spill the tail buffer, compact runs until they fit one
    /// merge, and return a cursor over the fully sorted stream.
    ///
    /// `cancel` is polled before each group merge and between merged
    /// records. On cancellation the current round's outputs are unlinked,
    /// its inputs are kept for `close`, and `Canceled` is returned.
    pub fn sort(&mut self, cancel: &CancelToken) -> Result<MergeCursor> {
        if !self.buf.is_empty() {
            self.spill()?;
        }
        // Reserve one descriptor for a merge's output. A fan-in below two
        // cannot shrink the run count, so it is raised even when that
        // means a round briefly exceeds the budget by one descriptor.
        let fan_in = (self.opt.max_open_files - 1).max(2);
        while self.run_files.len() > fan_in {
            self.compact_round(fan_in, cancel)?;
        }
        MergeCursor::open(
            &self.run_files,
            self.opt.compression,
            Arc::clone(&self.comparer),
            self.opt.read_buffer_bytes,
        )
    }

    /// Number of run files currently spilled to disk.
    pub fn spilled_runs(&self) -> usize {
        self.run_files.len()
    }

    /// Remove every temp file the sorter still owns. NotFound is tolerated
    /// so external cleanup does not turn into an error; the first other
    /// unlink error is surfaced after the sweep completes. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        let mut first_err: Option<SortError> = None;
        for path in self.run_files.drain(..) {
            if let Err(e) = remove_file_quiet(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove run file");
                if first_err.is_none() {
                    first_err = Some(e.into());
                }
            }
        }
        self.buf.reset();
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Sort the buffer and write it out as one new run. On failure the
    /// partial run is unlinked and the buffer is kept, so the caller may
    /// retry the append or close cleanly.
    fn spill(&mut self) -> Result<()> {
        self.buf.sort(&*self.comparer);
        let mut writer =
            RunWriter::create(&self.temp_dir, self.opt.compression, self.opt.write_buffer_bytes)?;
        for record in self.buf.records() {
            if let Err(e) = writer.append(record) {
                writer.abort();
                return Err(e);
            }
        }
        let path = writer.finish()?;
        tracing::debug!(
            path = %path.display(),
            records = self.buf.len(),
            bytes = self.buf.bytes(),
            "spilled run"
        );
        self.run_files.push(path);
        self.buf.reset();
        Ok(())
    }

    /// One compaction round: replace the current runs with one merged run
    /// per group, in group order.
    fn compact_round(&mut self, fan_in: usize, cancel: &CancelToken) -> Result<()> {
        let (threads, group_size) =
            round_shape(self.opt.max_open_files, fan_in, self.opt.compaction_threads);
        let groups: Vec<(usize, &[PathBuf])> =
            self.run_files.chunks(group_size).enumerate().collect();
        tracing::debug!(
            runs = self.run_files.len(),
            groups = groups.len(),
            threads,
            "compaction round"
        );

        let temp_dir = &self.temp_dir;
        let comparer = &self.comparer;
        let compression = self.opt.compression;
        let read_buf = self.opt.read_buffer_bytes;
        let write_buf = self.opt.write_buffer_bytes;

        // Outputs are recorded as they are produced so a failed or
        // canceled round can unlink them while keeping every input intact.
        let produced: Mutex<Vec<(usize, PathBuf)>> = Mutex::new(Vec::with_capacity(groups.len()));
        let merge_one = |&(index, group): &(usize, &[PathBuf])| -> Result<()> {
            if cancel.is_canceled() {
                return Err(SortError::Canceled);
            }
            let path = merge_group(
                group, temp_dir, compression, comparer, read_buf, write_buf, cancel,
            )?;
            produced.lock().push((index, path));
            Ok(())
        };

        let outcome = if threads <= 1 {
            groups.iter().try_for_each(merge_one)
        } else {
            // Bounded dispatch: at most `threads` group merges in flight.
            let mut res = Ok(());
            for chunk in groups.chunks(threads) {
                res = chunk.par_iter().try_for_each(merge_one);
                if res.is_err() {
                    break;
                }
            }
            res
        };

        match outcome {
            Ok(()) => {
                let mut outputs = produced.into_inner();
                outputs.sort_unstable_by_key(|&(index, _)| index);
                let survivors: Vec<PathBuf> =
                    outputs.into_iter().map(|(_, path)| path).collect();
                let consumed = std::mem::replace(&mut self.run_files, survivors);
                let mut first_err: Option<SortError> = None;
                for path in consumed {
                    if let Err(e) = remove_file_quiet(&path) {
                        tracing::warn!(path = %path.display(), error = %e, "failed to remove merged-away run");
                        // Keep tracking the file so close can still reap it.
                        self.run_files.push(path);
                        if first_err.is_none() {
                            first_err = Some(e.into());
                        }
                    }
                }
                match first_err {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            }
            Err(e) => {
                for (_, path) in produced.into_inner() {
                    if let Err(unlink_err) = remove_file_quiet(&path) {
                        tracing::warn!(path = %path.display(), error = %unlink_err, "failed to remove aborted round output");
                        self.run_files.push(path);
                    }
                }
                Err(e)
            }
        }
    }
}

/// Descriptor-budget split for one compaction round: how many group merges
/// may run at once and how many inputs each may hold. A merge holds its
/// group plus one output, and a useful merge needs at least three
/// descriptors, so requested parallelism is capped to what the budget can
/// host simultaneously and groups shrink to make room for it.
fn round_shape(max_open_files: usize, fan_in: usize, requested_threads: usize) -> (usize, usize) {
    let threads = requested_threads.min(max_open_files / 3).max(1);
    let group_size = (max_open_files / threads).saturating_sub(1).clamp(2, fan_in);
    (threads, group_size)
}


impl Drop for Sorter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Merge one group of runs into a single new run file. The inputs are left
/// in place; the round owns their removal.
fn merge_group(
    group: &[PathBuf],
    temp_dir: &Path,
    compression: Compression,
    comparer: &Arc<dyn Comparer>,
    read_buf: usize,
    write_buf: usize,
    cancel: &CancelToken,
) -> Result<PathBuf> {
    let mut cursor = MergeCursor::open(group, compression, Arc::clone(comparer), read_buf)?;
    let mut writer = match RunWriter::create(temp_dir, compression, write_buf) {
        Ok(w) => w,
        Err(e) => {
            let _ = cursor.close();
            return Err(e);
        }
    };
    tracing::debug!(inputs = group.len(), output = %writer.path().display(), "group merge");

    loop {
        if cancel.is_canceled() {
            let _ = cursor.close();
            writer.abort();
            return Err(SortError::Canceled);
        }
        if !cursor.next() {
            break;
        }
        if let Err(e) = writer.append(cursor.current()) {
            let _ = cursor.close();
            writer.abort();
            return Err(e);
        }
    }

    if let Some(e) = cursor.take_error() {
        let _ = cursor.close();
        writer.abort();
        return Err(e);
    }
    cursor.close()?;
    writer.finish()
}
