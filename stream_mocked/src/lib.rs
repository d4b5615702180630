//! In-memory mock stream for testing buffered wrappers.
//!
//! `MemStream` behaves like a small seekable file:
//!
//! - `read` copies from the backing bytes at the cursor,
//! - `write` overwrites at the cursor and grows the backing bytes as needed,
//! - `seek` repositions the cursor.
//!
//! The mock records every operation (call counts and per-call transfer
//! sizes) so tests can assert how often and how large the underlying
//! calls were. Short transfers and one-shot errors can be injected:
//!
//! - `limit_reads` / `limit_writes` cap the bytes moved per call,
//! - `fail_next_read` / `fail_next_write` / `fail_next_seek` make the next
//!   matching call fail with the given `embedded_io::ErrorKind`.
//!
//! Clones share the same state, so a test can keep a handle for
//! inspection after moving the stream into a wrapper.

use embedded_io::{ErrorKind, SeekFrom};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct StreamState {
    data: Vec<u8>,
    pos: usize,

    read_limit: Option<usize>,
    write_limit: Option<usize>,
    fail_read: Option<ErrorKind>,
    fail_write: Option<ErrorKind>,
    fail_seek: Option<ErrorKind>,

    read_sizes: Vec<usize>,
    write_sizes: Vec<usize>,
    seek_calls: usize,
    flush_calls: usize,
}

/// Seekable in-memory stream with operation recording.
#[derive(Clone, Default)]
pub struct MemStream(Arc<Mutex<StreamState>>);

impl MemStream {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream whose backing bytes are already populated.
    /// The cursor starts at position 0.
    #[must_use]
    pub fn with_contents(data: &[u8]) -> Self {
        let stream = Self::new();
        stream.0.lock().unwrap().data = data.to_vec();
        stream
    }

    /// Snapshot of the backing bytes.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().data.clone()
    }

    /// Current cursor position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.0.lock().unwrap().pos
    }

    /// Cap the number of bytes moved per `read` call.
    pub fn limit_reads(&self, max: usize) {
        self.0.lock().unwrap().read_limit = Some(max);
    }

    /// Cap the number of bytes moved per `write` call.
    pub fn limit_writes(&self, max: usize) {
        self.0.lock().unwrap().write_limit = Some(max);
    }

    /// Make the next `read` call fail with `kind`.
    pub fn fail_next_read(&self, kind: ErrorKind) {
        self.0.lock().unwrap().fail_read = Some(kind);
    }

    /// Make the next `write` call fail with `kind`.
    pub fn fail_next_write(&self, kind: ErrorKind) {
        self.0.lock().unwrap().fail_write = Some(kind);
    }

    /// Make the next `seek` call fail with `kind`.
    pub fn fail_next_seek(&self, kind: ErrorKind) {
        self.0.lock().unwrap().fail_seek = Some(kind);
    }

    /// Number of `read` calls seen so far.
    #[must_use]
    pub fn read_calls(&self) -> usize {
        self.0.lock().unwrap().read_sizes.len()
    }

    /// Number of `write` calls seen so far.
    #[must_use]
    pub fn write_calls(&self) -> usize {
        self.0.lock().unwrap().write_sizes.len()
    }

    /// Number of `seek` calls seen so far.
    #[must_use]
    pub fn seek_calls(&self) -> usize {
        self.0.lock().unwrap().seek_calls
    }

    /// Number of `flush` calls seen so far.
    #[must_use]
    pub fn flush_calls(&self) -> usize {
        self.0.lock().unwrap().flush_calls
    }

    /// Requested length of each `read` call, in order.
    #[must_use]
    pub fn read_sizes(&self) -> Vec<usize> {
        self.0.lock().unwrap().read_sizes.clone()
    }

    /// Length of each `write` call, in order.
    #[must_use]
    pub fn write_sizes(&self) -> Vec<usize> {
        self.0.lock().unwrap().write_sizes.clone()
    }
}

impl embedded_io::ErrorType for MemStream {
    type Error = ErrorKind;
}

impl embedded_io::Read for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut state = self.0.lock().unwrap();
        state.read_sizes.push(buf.len());
        if let Some(kind) = state.fail_read.take() {
            return Err(kind);
        }

        let available = state.data.len().saturating_sub(state.pos);
        let mut n = available.min(buf.len());
        if let Some(limit) = state.read_limit {
            n = n.min(limit);
        }
        let pos = state.pos;
        buf[..n].copy_from_slice(&state.data[pos..pos + n]);
        state.pos += n;
        Ok(n)
    }
}

impl embedded_io::Write for MemStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.0.lock().unwrap();
        state.write_sizes.push(buf.len());
        if let Some(kind) = state.fail_write.take() {
            return Err(kind);
        }

        let mut n = buf.len();
        if let Some(limit) = state.write_limit {
            n = n.min(limit);
        }
        let end = state.pos + n;
        if state.data.len() < end {
            state.data.resize(end, 0);
        }
        let pos = state.pos;
        state.data[pos..end].copy_from_slice(&buf[..n]);
        state.pos = end;
        Ok(n)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.lock().unwrap().flush_calls += 1;
        Ok(())
    }
}

impl embedded_io::Seek for MemStream {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64, Self::Error> {
        let mut state = self.0.lock().unwrap();
        state.seek_calls += 1;
        if let Some(kind) = state.fail_seek.take() {
            return Err(kind);
        }

        #[allow(clippy::cast_possible_wrap)]
        let target = match pos {
            SeekFrom::Start(offset) => i64::try_from(offset).map_err(|_| ErrorKind::InvalidInput)?,
            SeekFrom::Current(offset) => state.pos as i64 + offset,
            SeekFrom::End(offset) => state.data.len() as i64 + offset,
        };
        let target = usize::try_from(target).map_err(|_| ErrorKind::InvalidInput)?;
        state.pos = target;
        Ok(target as u64)
    }
}

impl std::fmt::Debug for MemStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.0.lock().unwrap();
        f.debug_struct("MemStream")
            .field("len", &state.data.len())
            .field("pos", &state.pos)
            .finish()
    }
}
