// error types surfaced by readers, writers, and pumps.
//
// read-side protocol errors travel inside std::io::Error so the reader can stay a
// plain AsyncRead; use io::Error::get_ref + downcast to tell them apart. the pump has
// its own enum since it is not bound to the AsyncRead signature.

use std::{
    fmt,
    io,
    sync::Arc,
};
use thiserror::Error;


/// Error delivered to every reader after the writer canceled the stream abruptly
/// ([`Writer::cancel`][crate::Writer::cancel]).
///
/// Reaches the caller as an [`io::Error`] of kind [`io::ErrorKind::Other`]. Bytes not
/// yet drained when the cancel landed are never delivered.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("stream writer canceled")]
pub struct WriterCanceledError;

/// Error delivered to a reader that canceled itself
/// ([`Reader::cancel`][crate::Reader::cancel] or a [`CancelHandle`][crate::CancelHandle]).
///
/// Reaches the caller as an [`io::Error`] of kind [`io::ErrorKind::Other`]. Other
/// readers of the same stream are unaffected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("reader canceled")]
pub struct ReaderCanceledError;

/// Error delivered when a blocked read ran into the reader's wait deadline
/// ([`Reader::set_wait_deadline`][crate::Reader::set_wait_deadline]).
///
/// Reaches the caller as an [`io::Error`] of kind [`io::ErrorKind::TimedOut`]. The
/// reader itself is untouched: a later read resumes from the same source position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("wait for new data timed out")]
pub struct WaitTimedOutError;

/// Error delivered when a blocked read was released by the reader's wait token
/// ([`Reader::set_wait_cancel`][crate::Reader::set_wait_cancel]).
///
/// Reaches the caller as an [`io::Error`] of kind [`io::ErrorKind::Other`]. Like the
/// deadline case, the reader remains usable afterward.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("wait for new data canceled")]
pub struct WaitCanceledError;

/// Error delivered to readers at the true end of a stream the writer aborted
/// ([`Writer::abort`][crate::Writer::abort]).
///
/// Every reader receives it only after draining all bytes written before the close,
/// and they all share the producer's original error through an `Arc` — reachable via
/// [`source`](std::error::Error::source) or [`get_ref`](AbortedError::get_ref). The
/// wrapping [`io::Error`] preserves the original's [`io::ErrorKind`].
#[derive(Debug, Clone)]
pub struct AbortedError {
    cause: Arc<io::Error>,
}

impl AbortedError {
    pub(crate) fn new(cause: Arc<io::Error>) -> Self {
        AbortedError { cause }
    }

    /// The producer-supplied error passed to `abort`.
    pub fn get_ref(&self) -> &io::Error {
        &self.cause
    }

    /// Kind of the producer-supplied error.
    pub fn kind(&self) -> io::ErrorKind {
        self.cause.kind()
    }
}

impl fmt::Display for AbortedError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "stream aborted by writer")
    }
}

impl std::error::Error for AbortedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.cause)
    }
}

/// Error returned by [`pump`][crate::pump].
#[derive(Debug, Error)]
pub enum PumpError {
    /// The source or destination failed outright.
    #[error("i/o while pumping")]
    Io(#[from] io::Error),
    /// The request-scoped cancellation token fired.
    #[error("pump canceled")]
    Canceled,
    /// The writer canceled the stream abruptly.
    #[error(transparent)]
    WriterCanceled(WriterCanceledError),
    /// The writer aborted; everything written beforehand was already pumped.
    #[error(transparent)]
    Aborted(AbortedError),
}
