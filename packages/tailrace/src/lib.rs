//! Tail a byte stream while it is still being written.
//!
//! One [`Writer`] appends bytes to an append-only sink — a file, typically — while
//! any number of [`Reader`]s follow along, each over its own independently
//! positioned handle onto the same bytes. A reader that catches up with the writer
//! does not see end-of-stream: it waits, wakes when more bytes are announced, and
//! resumes reading. End-of-stream is reported only once the writer has closed and
//! the reader has drained everything, so a consumer can start streaming a file to a
//! client while it is still being generated.
//!
//! A stream finishes one of three ways, and readers can tell them apart:
//!
//! - clean close ([`Writer::close`] / `shutdown`): readers drain, then get `Ok(0)`.
//! - [`Writer::abort`] then close: readers drain everything first, then get the
//!   abort error instead of end-of-stream.
//! - [`Writer::cancel`]: readers stop immediately, undrained bytes and all.
//!
//! Each reader can additionally bow out on its own ([`Reader::cancel`] /
//! [`CancelHandle`]) or bound a blocked wait ([`Reader::set_wait_deadline`],
//! [`Reader::set_wait_cancel`]) without anyone else noticing. For serving a
//! growing file wholesale there is [`pump`], which bulk-copies and waits in one
//! loop. All of it speaks plain [`AsyncRead`](tokio::io::AsyncRead) /
//! [`AsyncWrite`](tokio::io::AsyncWrite).
//!
//! ```no_run
//! use tailrace::{Reader, Writer};
//! use tokio::io::{AsyncReadExt, AsyncWriteExt};
//!
//! # async fn demo() -> std::io::Result<()> {
//! let sink = tokio::fs::File::create("build.log").await?;
//! let mut writer = Writer::new(sink);
//! let progress = writer.progress();
//!
//! // follows the file as it grows, across both tasks' lifetimes
//! let tail = tokio::spawn(async move {
//!     let source = tokio::fs::File::open("build.log").await?;
//!     let mut reader = Reader::new(source, progress);
//!     let mut replay = Vec::new();
//!     reader.read_to_end(&mut replay).await?;
//!     Ok::<_, std::io::Error>(replay)
//! });
//!
//! writer.write_all(b"compiling\n").await?;
//! writer.flush().await?;
//! writer.write_all(b"linking\n").await?;
//! writer.shutdown().await?;
//! # let _ = tail.await;
//! # Ok(()) }
//! ```

#[macro_use]
extern crate tracing;

mod pump;
mod stream;

pub use crate::pump::pump;
pub use crate::stream::core::{Changed, Subscription};
pub use crate::stream::reader::{CancelHandle, Reader};
pub use crate::stream::writer::{Progress, Writer};

/// Error types
pub mod error {
    pub use crate::stream::error::{
        AbortedError,
        PumpError,
        ReaderCanceledError,
        WaitCanceledError,
        WaitTimedOutError,
        WriterCanceledError,
    };
}
