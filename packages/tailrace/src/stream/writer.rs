// producer side: an AsyncWrite adapter that publishes write progress, plus the
// cloneable Progress handle that readers and pumps observe.

use super::{
    core::{Shared, Subscription},
    error::AbortedError,
};
use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Poll, Context, ready},
};
use tokio::io::{AsyncWrite, AsyncWriteExt};


/// Producer half of a tail-while-write stream.
///
/// Wraps an append-only byte sink. Every successful write is counted and announced to
/// all subscribed readers, so a [`Reader`][crate::Reader] that hit the current end of
/// data resumes as soon as more arrives. Exactly one `Writer` exists per stream; it
/// writes through the standard [`AsyncWrite`] interface.
///
/// The sink must leave bytes visible to the paired sources once a write completes.
/// Sinks that buffer internally (`tokio::fs::File` does) should be flushed before the
/// producer pauses for long, otherwise readers learn about bytes a moment before they
/// can actually see them and wait for the next announcement.
///
/// A stream ends in one of three ways:
///
/// - [`shutdown`](AsyncWriteExt::shutdown) (or [`close`](Writer::close)): graceful
///   end. Readers drain whatever was written, then see clean end-of-stream.
/// - [`abort`](Writer::abort) followed by shutdown: graceful failure. Readers drain
///   everything written first, then receive the abort error instead of end-of-stream.
/// - [`cancel`](Writer::cancel): abrupt failure. Readers stop where they are, even
///   with bytes left undrained.
///
/// Dropping a `Writer` that was never shut down cancels the stream, so readers are
/// never left blocked on a producer that died.
pub struct Writer<W> {
    sink: W,
    shared: Arc<Shared>,
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    /// Wrap a sink, starting a new open stream with zero bytes written.
    pub fn new(sink: W) -> Self {
        Writer { sink, shared: Shared::new() }
    }

    /// Flush and close the sink, then mark the stream closed and release every
    /// blocked reader.
    ///
    /// Same operation as [`shutdown`](AsyncWriteExt::shutdown). The stream is marked
    /// closed even if the sink's own close fails, so readers cannot hang on a failed
    /// close; the sink error is still returned.
    pub async fn close(&mut self) -> io::Result<()> {
        self.shutdown().await
    }

    /// Record `err` as the stream's terminal failure without closing it.
    ///
    /// The first abort wins; later calls are no-ops. Readers keep draining bytes
    /// already written (and any written after this call) and only receive the error
    /// at the true end of the stream, once the writer closes. For an immediate stop
    /// use [`cancel`](Writer::cancel) instead.
    pub fn abort(&self, err: io::Error) {
        if self.shared.set_abort(err) {
            debug!("stream abort recorded");
        }
    }

    /// Cancel the stream abruptly, waking every blocked reader.
    ///
    /// Readers observe this before anything else short of their own cancellation:
    /// blocked reads return [`WriterCanceledError`][crate::error::WriterCanceledError]
    /// right away and subsequent reads do too, with undrained bytes discarded. No
    /// close is required first. One-way and idempotent.
    pub fn cancel(&self) {
        if !self.shared.is_canceled() {
            debug!("stream canceled");
        }
        self.shared.cancel();
    }

    /// Cheap cloneable handle observing this writer's progress and terminal state.
    ///
    /// [`Reader`][crate::Reader]s and [`pump`][crate::pump]s are built from it, which
    /// leaves the `Writer` itself free to move into the producer task.
    pub fn progress(&self) -> Progress {
        Progress { shared: Arc::clone(&self.shared) }
    }

    /// Total bytes the sink has accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.shared.bytes_written()
    }

    /// Shared reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Exclusive reference to the underlying sink.
    ///
    /// Bytes written directly to the sink bypass the progress counter and wake no
    /// one; reserve this for out-of-band concerns like metadata syncs.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for Writer<W> {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context, buf: &[u8]) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        // progress only advances while the stream is open. some sinks accept writes
        // after shutdown, so this is enforced here rather than delegated.
        if this.shared.is_closed() {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "write to closed stream",
            )));
        }
        let n = ready!(Pin::new(&mut this.sink).poll_write(cx, buf))?;
        if n > 0 {
            this.shared.advance(n as u64);
        }
        Poll::Ready(Ok(n))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().sink).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let res = ready!(Pin::new(&mut this.sink).poll_shutdown(cx));
        if !this.shared.is_closed() {
            debug!("stream closed");
        }
        // closed even if the sink's shutdown failed: readers must not hang on it
        this.shared.close();
        Poll::Ready(res)
    }
}

impl<W> Drop for Writer<W> {
    fn drop(&mut self) {
        // a writer dropped without closing would otherwise leave readers blocked
        // until the end of the process
        if !self.shared.is_closed() && !self.shared.is_canceled() {
            debug!("writer dropped before close, canceling stream");
            self.shared.cancel();
        }
    }
}

/// Observation handle for one stream: write progress, terminal state, and wake
/// subscriptions.
///
/// Cloning is cheap (a reference-count bump) and every clone observes the same
/// stream. Obtained from [`Writer::progress`]; consumed by
/// [`Reader::new`][crate::Reader::new] and [`pump`][crate::pump], and usable directly
/// to build custom consumers on the same contract: read until the source runs dry,
/// then wait on a [`subscribe`](Progress::subscribe)d handle and re-check this state.
#[derive(Clone)]
pub struct Progress {
    shared: Arc<Shared>,
}

impl Progress {
    /// Total bytes the sink has accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.shared.bytes_written()
    }

    /// Whether the writer closed the stream. Once closed, the byte count is final.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Whether the writer canceled the stream abruptly.
    pub fn is_canceled(&self) -> bool {
        self.shared.is_canceled()
    }

    /// The abort error recorded by [`Writer::abort`], if any.
    pub fn abort_error(&self) -> Option<AbortedError> {
        self.shared.abort_error().map(AbortedError::new)
    }

    /// Register a wake handle on this stream.
    ///
    /// The handle resolves (coalesced) whenever bytes are written or the stream
    /// reaches a terminal state; after the writer closes, it resolves immediately,
    /// forever.
    pub fn subscribe(&self) -> Subscription {
        self.shared.subscribe()
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Progress {
        Progress { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}
