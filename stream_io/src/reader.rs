//! Buffered reading from a source stream.
//!
//! # Example
//!
//! ```no_run
//! use embedded_io::Read;
//! use stream_io::BufReader;
//! # fn demo<S: Read>(source: S) -> Result<(), S::Error> {
//!
//! let mut reader = BufReader::new(source);
//! let mut chunk = [0u8; 16];
//! loop {
//!     let n = reader.read(&mut chunk)?;
//!     if n == 0 {
//!         break;
//!     }
//!     // use chunk[..n]
//! }
//! # Ok(())
//! # }
//! ```

use embedded_io::{Read, Seek, SeekFrom};

use crate::DEFAULT_BUF_SIZE;

/// Buffered wrapper around a source.
///
/// Small reads are served from an in-memory window filled by one larger
/// read against the underlying stream. A read at least as large as the
/// buffer capacity bypasses the buffer entirely once the window is
/// drained.
pub struct BufReader<S> {
    inner: S,
    buf: Box<[u8]>,
    /// Consumed bytes of the read window.
    pos: usize,
    /// Valid bytes of the read window. Invariant: `pos <= filled <= buf.len()`.
    filled: usize,
}

impl<S: Read> BufReader<S> {
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
            filled: 0,
        }
    }

    /// Current buffer capacity in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Reallocate the buffer to `capacity` bytes.
    ///
    /// Silently does nothing while the window still holds unread bytes;
    /// the caller keeps the old capacity. Resizing never discards data.
    pub fn set_buffer_size(&mut self, capacity: usize) {
        if self.filled > 0 {
            return;
        }
        self.buf = vec![0u8; capacity].into_boxed_slice();
    }

    /// Copy unread window bytes into `out`, advancing the window cursor.
    fn take_from_window(&mut self, out: &mut [u8]) -> usize {
        let available = self.filled - self.pos;
        let n = available.min(out.len());
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        if self.pos == self.filled {
            self.pos = 0;
            self.filled = 0;
        }
        n
    }

    fn discard_window(&mut self) {
        self.pos = 0;
        self.filled = 0;
    }
}

impl<S: Read + Seek> BufReader<S> {
    /// Move the read cursor by `offset` without a seek on the underlying
    /// stream when the target stays inside the unread window.
    ///
    /// Falls back to a real [`seek`](embedded_io::Seek::seek) otherwise.
    ///
    /// # Errors
    /// Returns the underlying stream's error if the fallback seek fails.
    pub fn seek_relative(&mut self, offset: i64) -> Result<(), S::Error> {
        let remaining = self.filled - self.pos;
        if let Ok(forward) = usize::try_from(offset) {
            if forward < remaining {
                self.pos += forward;
                return Ok(());
            }
        }
        self.seek(SeekFrom::Current(offset)).map(|_| ())
    }
}

impl<S: Read> embedded_io::ErrorType for BufReader<S> {
    type Error = S::Error;
}

impl<S: Read> Read for BufReader<S> {
    fn read(&mut self, out: &mut [u8]) -> Result<usize, Self::Error> {
        if out.is_empty() {
            return Ok(0);
        }

        let mut copied = self.take_from_window(out);
        if copied == out.len() {
            return Ok(copied);
        }

        // The window is drained past this point.
        let rest = &mut out[copied..];
        if rest.len() >= self.buf.len() {
            // Copying a buffer-sized read through the window gains nothing.
            return Ok(copied + self.inner.read(rest)?);
        }

        self.filled = self.inner.read(&mut self.buf)?;
        copied += self.take_from_window(rest);
        Ok(copied)
    }
}

impl<S: Read> embedded_io::BufRead for BufReader<S> {
    fn fill_buf(&mut self) -> Result<&[u8], Self::Error> {
        if self.pos == self.filled {
            self.pos = 0;
            self.filled = self.inner.read(&mut self.buf)?;
        }
        Ok(&self.buf[self.pos..self.filled])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.filled);
        if self.pos == self.filled {
            self.discard_window();
        }
    }
}

impl<S: Read + Seek> Seek for BufReader<S> {
    /// Seek in the underlying stream, discarding the read window.
    ///
    /// A `Current`-relative offset is given relative to the logical
    /// position, which trails the underlying cursor by the unread window
    /// length, so the delegated offset is adjusted by that length. If the
    /// adjustment would overflow, the read-ahead is rewound first and the
    /// caller's offset applied in a second seek.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let result = if let SeekFrom::Current(offset) = pos {
            #[allow(clippy::cast_possible_wrap)]
            let remainder = (self.filled - self.pos) as i64;
            match offset.checked_sub(remainder) {
                Some(adjusted) => self.inner.seek(SeekFrom::Current(adjusted))?,
                None => {
                    self.inner.seek(SeekFrom::Current(-remainder))?;
                    self.discard_window();
                    self.inner.seek(SeekFrom::Current(offset))?
                }
            }
        } else {
            self.inner.seek(pos)?
        };
        self.discard_window();
        Ok(result)
    }
}

impl<S> core::fmt::Debug for BufReader<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufReader")
            .field("capacity", &self.buf.len())
            .field("pos", &self.pos)
            .field("filled", &self.filled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Source yielding one byte per call, to exercise window bookkeeping.
    struct OneByteSource(Vec<u8>);

    impl embedded_io::ErrorType for OneByteSource {
        type Error = embedded_io::ErrorKind;
    }

    impl Read for OneByteSource {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0.remove(0);
            Ok(1)
        }
    }

    #[test]
    fn window_resets_when_drained() {
        let mut reader = BufReader::with_capacity(4, OneByteSource(b"ab".to_vec()));
        let mut buf = [0u8; 1];
        reader.read(&mut buf).expect("Should read");
        assert_eq!(reader.filled, 0, "drained window must reset");
    }

    #[test]
    fn short_underlying_reads_are_passed_through() {
        let mut reader = BufReader::with_capacity(4, OneByteSource(b"xyz".to_vec()));
        let mut buf = [0u8; 3];
        let n = reader.read(&mut buf).expect("Should read");
        assert_eq!(n, 1, "one refill serves what it got");
        assert_eq!(buf[0], b'x');
    }

    #[test]
    fn zero_length_read_is_a_no_op() {
        let mut reader = BufReader::with_capacity(4, OneByteSource(b"a".to_vec()));
        let n = reader.read(&mut []).expect("Should read");
        assert_eq!(n, 0);
        assert_eq!(reader.filled, 0);
    }
}
