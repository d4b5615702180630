//! Buffered duplex stream: reads and writes multiplexed over one buffer.
//!
//! One fixed-capacity buffer serves both directions, but never both at
//! once: at any moment it holds either read-ahead (a read window) or
//! pending writes, and every direction switch reconciles the underlying
//! cursor first. This is the reason a duplex stream must be seekable —
//! a refill reads ahead of the logical position, and switching back to
//! writing has to rewind the underlying cursor over the unconsumed
//! read-ahead before the write may touch the stream.
//!
//! The engine tracks the underlying cursor position so the logical
//! position is always known without a syscall.

use embedded_io::{Read, Seek, SeekFrom, Write};

use crate::error::StreamError;
use crate::DEFAULT_BUF_SIZE;

/// Buffered wrapper around a seekable duplex stream.
///
/// The `Seek` bound is load-bearing: a stream that is both a source and a
/// sink cannot be buffered without it, and the bound on the struct makes
/// that combination unrepresentable rather than a runtime error.
///
/// Buffer state invariants:
///
/// - `rpos <= rvalid <= buf.len()` (read window),
/// - `wpos <= buf.len()` (write window),
/// - at most one of `rvalid` and `wpos` is non-zero,
/// - `inner_pos` is the underlying cursor; the logical position is
///   `inner_pos - (rvalid - rpos) + wpos`.
pub struct BufStream<S: Read + Write + Seek> {
    inner: S,
    buf: Box<[u8]>,
    /// Consumed bytes of the read window.
    rpos: usize,
    /// Valid bytes of the read window.
    rvalid: usize,
    /// Bytes buffered for write, not yet flushed.
    wpos: usize,
    /// Underlying cursor position.
    inner_pos: u64,
}

impl<S: Read + Write + Seek> BufStream<S> {
    /// Wrap `inner` with the default buffer capacity.
    ///
    /// # Errors
    /// Returns the underlying stream's error if its position cannot be
    /// queried.
    pub fn new(inner: S) -> Result<Self, StreamError<S::Error>> {
        Self::with_capacity(DEFAULT_BUF_SIZE, inner)
    }

    /// Wrap `inner` with the given buffer capacity.
    ///
    /// # Errors
    /// Returns the underlying stream's error if its position cannot be
    /// queried.
    pub fn with_capacity(capacity: usize, mut inner: S) -> Result<Self, StreamError<S::Error>> {
        let inner_pos = inner.stream_position().map_err(StreamError::Io)?;
        Ok(Self {
            inner,
            buf: vec![0u8; capacity].into_boxed_slice(),
            rpos: 0,
            rvalid: 0,
            wpos: 0,
            inner_pos,
        })
    }

    /// Current buffer capacity in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Reallocate the buffer to `capacity` bytes.
    ///
    /// Silently does nothing while the buffer holds unflushed writes or an
    /// unread window; the caller keeps the old capacity. Resizing never
    /// forces a flush and never discards data.
    pub fn set_buffer_size(&mut self, capacity: usize) {
        if self.wpos > 0 || self.rvalid > 0 {
            return;
        }
        self.buf = vec![0u8; capacity].into_boxed_slice();
    }

    /// Logical stream position, without a syscall.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.inner_pos - (self.rvalid - self.rpos) as u64 + self.wpos as u64
    }

    /// Flush buffered writes and the underlying stream.
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

    /// Copy unread window bytes into `out`, advancing the window cursor.
    fn take_from_window(&mut self, out: &mut [u8]) -> usize {
        let available = self.rvalid - self.rpos;
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buf[self.rpos..self.rpos + n]);
        self.rpos += n;
        if self.rpos == self.rvalid {
            self.rpos = 0;
            self.rvalid = 0;
        }
        n
    }

    /// Copy what fits of `data` into the write buffer.
    fn buffer_from(&mut self, data: &[u8]) -> usize {
        let room = self.buf.len() - self.wpos;
        let n = room.min(data.len());
        self.buf[self.wpos..self.wpos + n].copy_from_slice(&data[..n]);
        self.wpos += n;
        n
    }

    /// Send all buffered writes downstream in one underlying write.
    ///
    /// A short underlying write is fatal here: the buffer is about to be
    /// reused and retrying the unsent remainder could duplicate bytes, so
    /// the remainder is dropped and the condition surfaced.
    fn flush_buf(&mut self) -> Result<(), StreamError<S::Error>> {
        if self.wpos == 0 {
            return Ok(());
        }
        let n = self
            .inner
            .write(&self.buf[..self.wpos])
            .map_err(StreamError::Io)?;
        self.inner_pos += n as u64;
        let buffered = self.wpos;
        self.wpos = 0;
        if n < buffered {
            return Err(StreamError::ShortFlush {
                written: n,
                buffered,
            });
        }
        Ok(())
    }

    /// Rewind the underlying cursor over unconsumed read-ahead and drop
    /// the window, so a write lands at the logical position.
    fn reconcile_read_window(&mut self) -> Result<(), StreamError<S::Error>> {
        if self.rvalid == 0 {
            return Ok(());
        }
        #[allow(clippy::cast_possible_wrap)]
        let ahead = (self.rvalid - self.rpos) as i64;
        if ahead > 0 {
            self.inner_pos = self
                .inner
                .seek(SeekFrom::Current(-ahead))
                .map_err(StreamError::Io)?;
        }
        self.rpos = 0;
        self.rvalid = 0;
        Ok(())
    }
}

impl<S: Read + Write + Seek> embedded_io::ErrorType for BufStream<S> {
    type Error = StreamError<S::Error>;
}

impl<S: Read + Write + Seek> Read for BufStream<S> {
    fn read(&mut self, out: &mut [u8]) -> Result<usize, Self::Error> {
        if out.is_empty() {
            return Ok(0);
        }

        // Stale buffered writes must reach the stream before it is read,
        // or the read would observe reordered content.
        self.flush_buf()?;

        let mut copied = self.take_from_window(out);
        if copied == out.len() {
            return Ok(copied);
        }

        // The window is drained past this point.
        let rest = &mut out[copied..];
        if rest.len() >= self.buf.len() {
            // Copying a buffer-sized read through the window gains nothing.
            let n = self.inner.read(rest).map_err(StreamError::Io)?;
            self.inner_pos += n as u64;
            return Ok(copied + n);
        }

        let n = self.inner.read(&mut self.buf).map_err(StreamError::Io)?;
        self.inner_pos += n as u64;
        self.rvalid = n;
        copied += self.take_from_window(rest);
        Ok(copied)
    }
}

impl<S: Read + Write + Seek> Write for BufStream<S> {
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if data.is_empty() {
            return Ok(0);
        }

        self.reconcile_read_window()?;

        let mut copied = 0;
        if self.wpos > 0 {
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
            self.inner_pos += n as u64;
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

impl<S: Read + Write + Seek> Seek for BufStream<S> {
    /// Reposition the logical cursor.
    ///
    /// A `Current`-relative target inside the unread window only moves the
    /// window cursor; no underlying call is made. Any other seek drops the
    /// window (translating `Current` offsets from the logical to the
    /// physical position), flushes pending writes, and delegates.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        if self.rvalid > 0 {
            let remaining = self.rvalid - self.rpos;
            if let SeekFrom::Current(offset) = pos {
                if let Ok(forward) = usize::try_from(offset) {
                    if forward < remaining {
                        self.rpos += forward;
                        return Ok(self.position());
                    }
                }
            }

            #[allow(clippy::cast_possible_wrap)]
            let remainder = remaining as i64;
            self.rpos = 0;
            self.rvalid = 0;
            let target = match pos {
                SeekFrom::Current(offset) => match offset.checked_sub(remainder) {
                    Some(adjusted) => SeekFrom::Current(adjusted),
                    None => {
                        // Offset too large to fold into one seek: rewind the
                        // read-ahead first, then apply the caller's offset.
                        self.inner
                            .seek(SeekFrom::Current(-remainder))
                            .map_err(StreamError::Io)?;
                        pos
                    }
                },
                other => other,
            };
            self.inner_pos = self.inner.seek(target).map_err(StreamError::Io)?;
            return Ok(self.inner_pos);
        }

        self.flush_buf()?;
        self.inner_pos = self.inner.seek(pos).map_err(StreamError::Io)?;
        Ok(self.inner_pos)
    }
}

impl<S: Read + Write + Seek> Drop for BufStream<S> {
    fn drop(&mut self) {
        if self.wpos > 0 {
            if let Err(err) = self.flush_buf() {
                log::warn!("BufStream dropped with unflushed data: {err}");
            }
        }
    }
}

impl<S: Read + Write + Seek> core::fmt::Debug for BufStream<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufStream")
            .field("capacity", &self.buf.len())
            .field("rpos", &self.rpos)
            .field("rvalid", &self.rvalid)
            .field("wpos", &self.wpos)
            .field("inner_pos", &self.inner_pos)
            .finish()
    }
}
