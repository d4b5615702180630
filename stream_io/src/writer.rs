//! Buffered writing to a sink stream.
//!
//! `BufWriter` collects small writes in memory and sends them downstream
//! in buffer-sized batches. The owner should call [`BufWriter::close`]
//! when done; the `Drop` implementation flushes as a best effort only and
//! reports failure through `log`, since drop cannot return an error.
//!
//! # Example
//!
//! ```no_run
//! use embedded_io::Write;
//! use stream_io::BufWriter;
//! # fn demo<S: Write>(sink: S) -> Result<(), stream_io::StreamError<S::Error>> {
//!
//! let mut writer = BufWriter::new(sink);
//! writer.write_all(b"many")?;
//! writer.write_all(b" small")?;
//! writer.write_all(b" pieces")?;
//! writer.close()?;
//! # Ok(())
//! # }
//! ```

use embedded_io::{Seek, SeekFrom, Write};

use crate::error::StreamError;
use crate::DEFAULT_BUF_SIZE;

/// Buffered wrapper around a sink.
pub struct BufWriter<S: Write> {
    inner: S,
    buf: Box<[u8]>,
    /// Bytes buffered but not yet sent downstream. Invariant: `pos <= buf.len()`.
    pos: usize,
}

impl<S: Write> BufWriter<S> {
    /// Wrap `inner` with the default buffer capacity.
    pub fn new(inner: S) -> Self {
        Self::with_capacity(DEFAULT_BUF_SIZE, inner)
    }

    /// Wrap `inner` with the given buffer capacity.
    pub fn with_capacity(capacity: usize, inner: S) -> Self {
        Self {
            inner,
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
        }
    }

    /// Current buffer capacity in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Reallocate the buffer to `capacity` bytes.
    ///
    /// Silently does nothing while unflushed bytes are buffered; the
    /// caller keeps the old capacity. Resizing never forces a flush.
    pub fn set_buffer_size(&mut self, capacity: usize) {
        if self.pos > 0 {
            return;
        }
        self.buf = vec![0u8; capacity].into_boxed_slice();
    }

    /// Flush buffered bytes and the underlying stream.
    /// Can be called multiple times.
    ///
    /// # Errors
    /// Returns the underlying stream's error, or
    /// [`StreamError::ShortFlush`] if the stream accepted only part of the
    /// buffered bytes.
    pub fn close(&mut self) -> Result<(), StreamError<S::Error>> {
        self.flush_buf()?;
        self.inner.flush().map_err(StreamError::Io)
    }

    /// Copy what fits of `data` into the buffer, advancing `pos`.
    fn buffer_from(&mut self, data: &[u8]) -> usize {
        let room = self.buf.len() - self.pos;
        let n = room.min(data.len());
        self.buf[self.pos..self.pos + n].copy_from_slice(&data[..n]);
        self.pos += n;
        n
    }

    /// Send all buffered bytes downstream in one underlying write.
    ///
    /// A short underlying write is fatal here: the buffer is about to be
    /// reused and there is no safe way to retry the unsent remainder, so
    /// the remainder is dropped and the condition surfaced.
    fn flush_buf(&mut self) -> Result<(), StreamError<S::Error>> {
        if self.pos == 0 {
            return Ok(());
        }
        let n = self
            .inner
            .write(&self.buf[..self.pos])
            .map_err(StreamError::Io)?;
        let buffered = self.pos;
        self.pos = 0;
        if n < buffered {
            return Err(StreamError::ShortFlush {
                written: n,
                buffered,
            });
        }
        Ok(())
    }
}

impl<S: Write> embedded_io::ErrorType for BufWriter<S> {
    type Error = StreamError<S::Error>;
}

impl<S: Write> Write for BufWriter<S> {
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut copied = 0;
        if self.pos > 0 {
            copied = self.buffer_from(data);
            if copied == data.len() {
                return Ok(copied);
            }
            // Buffer is full and more remains.
            self.flush_buf()?;
        }

        let rest = &data[copied..];
        if rest.len() >= self.buf.len() {
            // Buffer-sized or larger: no point staging it in memory.
            let n = self.inner.write(rest).map_err(StreamError::Io)?;
            return Ok(copied + n);
        }

        copied += self.buffer_from(rest);
        Ok(copied)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flush_buf()?;
        self.inner.flush().map_err(StreamError::Io)
    }
}

impl<S: Write + Seek> Seek for BufWriter<S> {
    /// Flush pending writes, then seek the underlying stream.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        self.flush_buf()?;
        self.inner.seek(pos).map_err(StreamError::Io)
    }
}

impl<S: Write> Drop for BufWriter<S> {
    fn drop(&mut self) {
        if self.pos > 0 {
            if let Err(err) = self.flush_buf() {
                log::warn!("BufWriter dropped with unflushed data: {err}");
            }
        }
    }
}

impl<S: Write> core::fmt::Debug for BufWriter<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufWriter")
            .field("capacity", &self.buf.len())
            .field("pos", &self.pos)
            .finish()
    }
}
