// consumer side: an AsyncRead adapter over one source plus the shared stream state.
//
// a read call runs the protocol loop: terminal flags first (own cancel, then writer
// cancel), then a source read, and on a zero-byte read the park decision under the
// registry lock. closure is only resolved once the byte counter stopped moving past
// the reader's last sample, which is what guarantees every written byte is drained
// before end-of-stream or an abort error is surfaced.

use super::{
    core::{Shared, Subscription, Wake},
    error::{AbortedError, ReaderCanceledError, WriterCanceledError},
    wait::{ArmedWait, WaitBounds},
    writer::Progress,
};
use std::{
    io,
    pin::Pin,
    sync::{
        atomic::{
            Ordering::Relaxed,
            AtomicBool,
        },
        Arc,
    },
    task::{Poll, Context, ready},
};
use tokio::{
    io::{AsyncRead, ReadBuf},
    time::Instant,
};
use tokio_util::sync::CancellationToken;


/// Consumer half of a tail-while-write stream.
///
/// Wraps one byte source (its own handle, positioned independently of every other
/// reader) plus a [`Progress`] handle to the stream's [`Writer`][crate::Writer].
/// Reads through the standard [`AsyncRead`] interface: while the stream is open, a
/// read at the current end of data waits for the writer instead of reporting
/// end-of-stream, and resumes as soon as more bytes are announced.
///
/// A read resolves with:
///
/// - `Ok(n)`, `n > 0` — bytes, in exact write order for this reader.
/// - `Ok(0)` — true end of stream: the writer closed and everything was drained.
///   Repeats on every later read.
/// - `Err` of kind `Other` wrapping
///   [`ReaderCanceledError`][crate::error::ReaderCanceledError] — this reader was
///   canceled ([`cancel`](Reader::cancel) or a [`CancelHandle`]). Wins over every
///   writer-side condition, and repeats.
/// - `Err` of kind `Other` wrapping
///   [`WriterCanceledError`][crate::error::WriterCanceledError] — the writer
///   [`cancel`][crate::Writer::cancel]ed the stream. Undrained bytes are discarded.
///   Wins over closure, and repeats.
/// - `Err` wrapping [`AbortedError`][crate::error::AbortedError] (original
///   [`kind`](std::io::Error::kind) preserved) — the writer
///   [`abort`][crate::Writer::abort]ed: delivered only at the true end, after every
///   byte written before the close was drained. Repeats.
/// - `Err` of kind `TimedOut` wrapping
///   [`WaitTimedOutError`][crate::error::WaitTimedOutError], or kind `Other` wrapping
///   [`WaitCanceledError`][crate::error::WaitCanceledError] — the blocked wait was
///   released by [`set_wait_deadline`](Reader::set_wait_deadline) /
///   [`set_wait_cancel`](Reader::set_wait_cancel). Unlike the above these are not
///   terminal: the source position is untouched and a later read resumes exactly
///   where this one would have.
/// - any other `Err` — the source failed; passed through unchanged.
///
/// Dropping the reader deregisters it from the stream; the writer and other readers
/// never notice.
pub struct Reader<R> {
    source: R,
    shared: Arc<Shared>,
    // created on first park, kept for the reader's lifetime
    sub: Option<Subscription>,
    canceled: Arc<AtomicBool>,
    bounds: WaitBounds,
    // Some while logically blocked at temporary end of data
    parked: Option<Parked>,
}

// state of a blocked wait. survives an abandoned read future and a fired wait bound,
// so the next read call resumes the same wait instead of re-reading the source.
struct Parked {
    // byte count sampled before the source read that came up empty
    seen: u64,
    // armed deadline/token for this wait. None when unbounded, not yet armed, or
    // already fired.
    limit: Option<ArmedWait>,
}

impl<R: AsyncRead + Unpin> Reader<R> {
    /// Wrap a source, following the stream observed by `progress`.
    ///
    /// The source must be this reader's own handle onto the same underlying bytes
    /// the writer appends to, positioned wherever the caller wants to start reading.
    pub fn new(source: R, progress: Progress) -> Self {
        Reader {
            source,
            shared: Arc::clone(progress.shared()),
            sub: None,
            canceled: Arc::new(AtomicBool::new(false)),
            bounds: WaitBounds::default(),
            parked: None,
        }
    }

    /// Cancel this reader.
    ///
    /// A blocked read wakes and returns
    /// [`ReaderCanceledError`][crate::error::ReaderCanceledError]; so does every
    /// later read. One-way. The writer and other readers are unaffected.
    pub fn cancel(&self) {
        self.canceled.store(true, Relaxed);
        // wake the whole registry; unrelated waiters recheck their state and re-park
        self.shared.notify_all();
    }

    /// Cloneable handle that [`cancel`](Reader::cancel)s this reader from another
    /// task, typically while the reader itself is moved into a read loop.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            canceled: Arc::clone(&self.canceled),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Bound every future blocked wait by a deadline, or clear it with `None`.
    ///
    /// Applies to the waiting portion of a read only — a read that finds bytes or a
    /// terminal state never consults it. A wait released by the deadline returns
    /// [`WaitTimedOutError`][crate::error::WaitTimedOutError] without disturbing the
    /// reader; the bound persists until changed, so a deadline already in the past
    /// fails every subsequent wait until replaced.
    pub fn set_wait_deadline(&mut self, deadline: Option<Instant>) {
        self.bounds.set_deadline(deadline);
        if let Some(parked) = self.parked.as_mut() {
            // next poll re-arms from the new bounds
            parked.limit = None;
        }
    }

    /// Bound every future blocked wait by a cancellation token, or clear it with
    /// `None`.
    ///
    /// Same scope and persistence as [`set_wait_deadline`](Reader::set_wait_deadline);
    /// a wait released by the token returns
    /// [`WaitCanceledError`][crate::error::WaitCanceledError].
    pub fn set_wait_cancel(&mut self, token: Option<CancellationToken>) {
        self.bounds.set_cancel(token);
        if let Some(parked) = self.parked.as_mut() {
            parked.limit = None;
        }
    }

    /// Observation handle for the stream this reader follows.
    pub fn progress(&self) -> Progress {
        Progress::from_shared(Arc::clone(&self.shared))
    }

    /// Shared reference to the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Exclusive reference to the underlying source.
    ///
    /// Reading from it directly moves the position this reader resumes from.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Deregister from the stream and return the source.
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Reader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            // terminal flags preempt bytes still sitting in the source. own cancel
            // over writer cancel, writer cancel over closure.
            if this.canceled.load(Relaxed) {
                this.parked = None;
                return Poll::Ready(Err(io::Error::other(ReaderCanceledError)));
            }
            if this.shared.is_canceled() {
                this.parked = None;
                return Poll::Ready(Err(io::Error::other(WriterCanceledError)));
            }

            if let Some(mut parked) = this.parked.take() {
                let sub = this.sub.as_mut().expect("parked reader has no subscription");
                match sub.poll_wait(cx, parked.seen) {
                    Poll::Ready(Wake::Advanced) => continue,
                    Poll::Ready(Wake::Closed) => {
                        // counter did not move past our sample, so the sink is
                        // drained: this is the true end of the stream
                        return Poll::Ready(match this.shared.abort_error() {
                            Some(cause) => Err(abort_to_io(cause)),
                            None => Ok(()),
                        });
                    }
                    Poll::Pending => {
                        if parked.limit.is_none() {
                            parked.limit = this.bounds.arm();
                        }
                        if let Some(limit) = parked.limit.as_mut() {
                            if let Poll::Ready(err) = limit.poll_expired(cx) {
                                // the wait state stays parked: a later read call
                                // resumes this same wait
                                parked.limit = None;
                                this.parked = Some(parked);
                                return Poll::Ready(Err(err));
                            }
                        }
                        this.parked = Some(parked);
                        return Poll::Pending;
                    }
                }
            }

            // sample before reading, so bytes counted from here on re-run the loop
            // instead of being parked over
            let seen = this.shared.bytes_written();
            let filled = buf.filled().len();
            ready!(Pin::new(&mut this.source).poll_read(cx, buf))?;
            if buf.filled().len() > filled {
                return Poll::Ready(Ok(()));
            }

            // temporary end of data. closure is deliberately not checked here: the
            // park path resolves it, and only once the counter stopped moving, so
            // undrained bytes always win over end-of-stream.
            if this.sub.is_none() {
                this.sub = Some(this.shared.subscribe());
            }
            this.parked = Some(Parked { seen, limit: None });
        }
    }
}

/// Cancels one [`Reader`] from anywhere.
///
/// Obtained from [`Reader::cancel_handle`]; clones all cancel the same reader.
#[derive(Clone)]
pub struct CancelHandle {
    canceled: Arc<AtomicBool>,
    shared: Arc<Shared>,
}

impl CancelHandle {
    /// Cancel the reader this handle was taken from. Wakes it if it is blocked;
    /// only that reader is affected.
    pub fn cancel(&self) {
        self.canceled.store(true, Relaxed);
        self.shared.notify_all();
    }
}

fn abort_to_io(cause: Arc<io::Error>) -> io::Error {
    let kind = cause.kind();
    io::Error::new(kind, AbortedError::new(cause))
}
