//! Error type for the buffered wrappers.

use core::fmt;

/// Failure of a buffered stream operation.
///
/// Generic over the underlying stream's error type so that errors from the
/// wrapped stream pass through verbatim. The only failure the buffering
/// layer adds on its own is [`StreamError::ShortFlush`].
#[derive(Debug, PartialEq, Eq)]
pub enum StreamError<E> {
    /// The underlying stream reported an I/O error.
    Io(E),
    /// A flush handed the buffered bytes to the underlying stream and the
    /// stream accepted only part of them. The buffer content is in an
    /// indeterminate partially-sent state at that point, so the unsent
    /// remainder is discarded rather than retried: a retry could duplicate
    /// bytes the stream did in fact accept.
    ShortFlush {
        /// Bytes the underlying stream accepted.
        written: usize,
        /// Bytes the flush tried to send.
        buffered: usize,
    },
}

impl<E: fmt::Debug> fmt::Display for StreamError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "underlying stream error: {err:?}"),
            Self::ShortFlush { written, buffered } => {
                write!(f, "flush accepted only {written} of {buffered} buffered bytes")
            }
        }
    }
}

impl<E: fmt::Debug> std::error::Error for StreamError<E> {}

impl<E: embedded_io::Error> embedded_io::Error for StreamError<E> {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::Io(err) => err.kind(),
            Self::ShortFlush { .. } => embedded_io::ErrorKind::Other,
        }
    }
}
