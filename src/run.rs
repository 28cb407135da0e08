use crate::codec::{FrameReader, FrameWriter};
use crate::error::{Result, SortError};
use crate::fs_util::remove_file_quiet;
use crate::options::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const ZSTD_LEVEL: i32 = 3;

/// Byte sink over one run file, optionally through a streaming compressor.
/// The whole file is one compressed member; records are never compressed
/// individually.
enum RunSink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Zstd(zstd::stream::write::Encoder<'static, BufWriter<File>>),
}

impl Write for RunSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            RunSink::Plain(w) => w.write(buf),
            RunSink::Gzip(w) => w.write(buf),
            RunSink::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            RunSink::Plain(w) => w.flush(),
            RunSink::Gzip(w) => w.flush(),
            RunSink::Zstd(w) => w.flush(),
        }
    }
}

impl RunSink {
    /// Drain compressor state, write the trailer, flush the file buffer.
    fn finish(self) -> io::Result<()> {
        match self {
            RunSink::Plain(mut w) => w.flush(),
            RunSink::Gzip(w) => w.finish()?.flush(),
            RunSink::Zstd(w) => w.finish()?.flush(),
        }
    }
}

/// Decompressing source over one run file.
enum RunSource {
    Plain(BufReader<File>),
    Gzip(GzDecoder<BufReader<File>>),
    Zstd(zstd::stream::read::Decoder<'static, BufReader<File>>),
}

impl Read for RunSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            RunSource::Plain(r) => r.read(buf),
            RunSource::Gzip(r) => r.read(buf),
            RunSource::Zstd(r) => r.read(buf),
        }
    }
}

/// Sequential writer for a new run file at a fresh, unique temp path.
pub(crate) struct RunWriter {
    path: PathBuf,
    frames: FrameWriter<RunSink>,
}

impl RunWriter {
    pub fn create(dir: &Path, compression: Compression, write_buf: usize) -> Result<Self> {
        let (file, path) = tempfile::Builder::new()
            .prefix("sortrun-")
            .tempfile_in(dir)?
            .keep()
            .map_err(|e| SortError::Io(e.error))?;
        let buffered = BufWriter::with_capacity(write_buf, file);
        let sink = match compression {
            Compression::None => RunSink::Plain(buffered),
            Compression::Gzip => {
                RunSink::Gzip(GzEncoder::new(buffered, flate2::Compression::default()))
            }
            Compression::Zstd => match zstd::stream::write::Encoder::new(buffered, ZSTD_LEVEL) {
                Ok(enc) => RunSink::Zstd(enc),
                Err(e) => {
                    let _ = remove_file_quiet(&path);
                    return Err(e.into());
                }
            },
        };
        Ok(Self { path, frames: FrameWriter::new(sink) })
    }

    pub fn append(&mut self, record: &[u8]) -> Result<()> {
        self.frames.append(record)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Finalize the compressor trailer, flush, and return the run path.
    /// On failure the partial file is unlinked.
    pub fn finish(self) -> Result<PathBuf> {
        let RunWriter { path, frames } = self;
        match frames.into_inner().finish() {
            Ok(()) => Ok(path),
            Err(e) => {
                let _ = remove_file_quiet(&path);
                Err(e.into())
            }
        }
    }

    /// Abandon the run and unlink the partial file.
    pub fn abort(self) {
        let RunWriter { path, frames } = self;
        drop(frames);
        let _ = remove_file_quiet(&path);
    }
}

/// Latched-error cursor over one run file.
pub(crate) struct RunReader {
    frames: FrameReader<RunSource>,
    err: Option<SortError>,
    done: bool,
}

impl RunReader {
    pub fn open(path: &Path, compression: Compression, read_buf: usize) -> Result<Self> {
        let file = File::open(path)?;
        let buffered = BufReader::with_capacity(read_buf, file);
        let source = match compression {
            Compression::None => RunSource::Plain(buffered),
            Compression::Gzip => RunSource::Gzip(GzDecoder::new(buffered)),
            Compression::Zstd => {
                RunSource::Zstd(zstd::stream::read::Decoder::with_buffer(buffered)?)
            }
        };
        Ok(Self { frames: FrameReader::new(source), err: None, done: false })
    }

    /// Advance to the next record. False means end of stream or a latched
    /// error; `error()` distinguishes the two.
    pub fn advance(&mut self) -> bool {
        if self.err.is_some() || self.done {
            return false;
        }
        match self.frames.advance() {
            Ok(true) => true,
            Ok(false) => {
                self.done = true;
                false
            }
            Err(e) => {
                self.err = Some(e);
                self.done = true;
                false
            }
        }
    }

    /// Record decoded by the last successful `advance`. Aliases the decode
    /// buffer, so it is only valid until the next `advance`.
    pub fn current(&self) -> &[u8] {
        if self.err.is_some() {
            &[]
        } else {
            self.frames.current()
        }
    }

    pub fn take_error(&mut self) -> Option<SortError> {
        self.err.take()
    }
}
