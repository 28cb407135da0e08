//! Run-file frame codec.
//!
//! Record layout on the byte stream:
//! - LENGTH   signed varint (zigzag, little-endian 7-bit groups) of the
//!            payload length in bytes
//! - PAYLOAD  the record, arbitrary bytes, may be empty
//! - CRC32    u32 (LE), CRC32-IEEE over PAYLOAD only
//!
//! A stream is a plain concatenation of frames with no file header and no
//! separators. End of stream is only valid at a frame boundary; anything
//! else (truncation, CRC mismatch, a negative or overlong length) reads as
//! `BadStream`.

use crate::error::{Result, SortError};
use integer_encoding::VarInt;
use std::io::{self, Read, Write};

const MAX_VARINT_LEN: usize = 10;

/// Writes length-prefixed, CRC-protected frames to an underlying stream.
pub(crate) struct FrameWriter<W: Write> {
    sink: W,
    scratch: [u8; MAX_VARINT_LEN],
}

impl<W: Write> FrameWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, scratch: [0; MAX_VARINT_LEN] }
    }

    /// Frame and write one record.
    pub fn append(&mut self, payload: &[u8]) -> Result<()> {
        let n = (payload.len() as i64).encode_var(&mut self.scratch);
        self.sink.write_all(&self.scratch[..n])?;
        self.sink.write_all(payload)?;
        self.sink.write_all(&crc32fast::hash(payload).to_le_bytes())?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Reads frames back, reusing one decode buffer across records.
pub(crate) struct FrameReader<R: Read> {
    src: R,
    buf: Vec<u8>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(src: R) -> Self {
        Self { src, buf: Vec::new() }
    }

    /// Decode the next frame into the internal buffer.
    ///
    /// `Ok(false)` means a clean end of stream at a frame boundary.
    pub fn advance(&mut self) -> Result<bool> {
        let len = match self.read_len()? {
            Some(v) => v,
            None => return Ok(false),
        };
        if len < 0 {
            return Err(SortError::BadStream("negative record length"));
        }
        self.buf.clear();
        self.buf.resize(len as usize, 0);
        read_frame_exact(&mut self.src, &mut self.buf)?;
        let mut crc = [0u8; 4];
        read_frame_exact(&mut self.src, &mut crc)?;
        if crc32fast::hash(&self.buf) != u32::from_le_bytes(crc) {
            return Err(SortError::BadStream("crc mismatch"));
        }
        Ok(true)
    }

    /// The payload decoded by the last successful `advance`. Aliases the
    /// internal buffer, so it is valid only until the next `advance`.
    pub fn current(&self) -> &[u8] {
        &self.buf
    }

    /// Varint length prefix; `None` on end of stream before the first byte.
    fn read_len(&mut self) -> Result<Option<i64>> {
        let mut raw = [0u8; MAX_VARINT_LEN];
        let mut n = 0;
        loop {
            let mut byte = [0u8; 1];
            match self.src.read(&mut byte) {
                Ok(0) if n == 0 => return Ok(None),
                Ok(0) => return Err(SortError::BadStream("truncated length prefix")),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
            if n == MAX_VARINT_LEN {
                return Err(SortError::BadStream("overlong length prefix"));
            }
            raw[n] = byte[0];
            n += 1;
            if byte[0] & 0x80 == 0 {
                break;
            }
        }
        let (v, _) = i64::decode_var(&raw[..n])
            .ok_or(SortError::BadStream("overlong length prefix"))?;
        Ok(Some(v))
    }
}

/// `read_exact` that reports truncation as a stream defect rather than IO.
fn read_frame_exact(src: &mut impl Read, buf: &mut [u8]) -> Result<()> {
    src.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => SortError::BadStream("truncated frame"),
        _ => SortError::Io(e),
    })
}
