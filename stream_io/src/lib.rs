//! Buffered wrappers over byte streams.
//!
//! The stream capabilities are the [`embedded_io`] traits: a source
//! implements [`Read`](embedded_io::Read), a sink implements
//! [`Write`](embedded_io::Write), and a repositionable stream implements
//! [`Seek`](embedded_io::Seek). A wrapper in this crate holds one
//! fixed-capacity buffer and multiplexes calls against it to amortize the
//! cost of the underlying calls:
//!
//! - [`BufReader`] buffers a source,
//! - [`BufWriter`] buffers a sink,
//! - [`BufStream`] buffers a duplex stream (source and sink on one cursor).
//!
//! A duplex stream must also be seekable: switching from reading back to
//! writing has to rewind the read-ahead the buffer holds, and there is no
//! other way to reconcile the two directions on a single cursor. The
//! `Seek` bound on [`BufStream`] enforces this at compile time.
//!
//! The wrappers implement the same `embedded_io` traits they consume, so a
//! buffered stream is itself a valid stream.
//!
//! # Example
//!
//! ```no_run
//! use embedded_io::{Read, Seek, SeekFrom, Write};
//! use stream_io::BufStream;
//! # fn demo<S: Read + Write + Seek>(file: S) -> Result<(), Box<dyn std::error::Error>>
//! # where S::Error: 'static {
//!
//! let mut stream = BufStream::new(file)?;
//! stream.write_all(b"header")?;
//! stream.seek(SeekFrom::Start(0))?;
//! let mut buf = [0u8; 6];
//! stream.read(&mut buf)?;
//! stream.close()?;
//! # Ok(())
//! # }
//! ```

mod duplex;
mod error;
mod reader;
mod writer;

pub use duplex::BufStream;
pub use error::StreamError;
pub use reader::BufReader;
pub use writer::BufWriter;

/// Default buffer capacity in bytes.
pub const DEFAULT_BUF_SIZE: usize = 8192;
