// shared stream state. the writer, reader, and progress handles are convenience wrappers
// around this.
//
// atomics are relaxed; the waiter mutex carries the ordering. the writer advances the
// byte counter before locking the registry to wake, and a reader compares the counter
// against its last-seen value under that same lock before parking, so the reader either
// sees the advance and retries or parks a waker the writer's wake pass will observe.
// terminal flags are likewise stored before the locked wake pass that announces them.

use std::{
    collections::HashMap,
    future::Future,
    io,
    pin::Pin,
    sync::{
        atomic::{
            Ordering::Relaxed,
            AtomicBool,
            AtomicU64,
        },
        Arc,
        Mutex,
        OnceLock,
    },
    task::{Poll, Context, Waker},
};


// stream shared state.
pub(crate) struct Shared {
    // mutex around the waiter registry.
    waiters: Mutex<Waiters>,

    // total bytes the sink has accepted. only advances while the stream is open.
    written: AtomicU64,
    // set by close. one-way.
    closed: AtomicBool,
    // set by cancel. one-way.
    canceled: AtomicBool,
    // set by the first abort call, never changed after. readers surface it once they
    // observe closed and have drained the sink.
    abort: OnceLock<Arc<io::Error>>,
}

// waiter registry.
struct Waiters {
    // wake slot per live subscription.
    slots: HashMap<u64, Slot>,
    // next subscription id.
    next_id: u64,
    // set by close. once set, slots is drained and stays empty, and every wait
    // resolves immediately.
    closed: bool,
}

// wake state for one subscription. the pending flag is binary, so a producer that
// writes faster than a waiter drains wakes never queues more than one.
#[derive(Default)]
struct Slot {
    // wake delivered but not yet consumed by the owner.
    notified: bool,
    // waker parked by the owner while it is blocked.
    waker: Option<Waker>,
}

// why a reader's blocked wait resolved.
pub(crate) enum Wake {
    // the byte counter moved past the reader's last-seen value.
    Advanced,
    // the stream closed.
    Closed,
}

impl Shared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Shared {
            waiters: Mutex::new(Waiters {
                slots: HashMap::new(),
                next_id: 0,
                closed: false,
            }),
            written: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            canceled: AtomicBool::new(false),
            abort: OnceLock::new(),
        })
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.written.load(Relaxed)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Relaxed)
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Relaxed)
    }

    // record the abort error. first caller wins; later calls are no-ops. returns
    // whether this call recorded it.
    pub(crate) fn set_abort(&self, err: io::Error) -> bool {
        self.abort.set(Arc::new(err)).is_ok()
    }

    pub(crate) fn abort_error(&self) -> Option<Arc<io::Error>> {
        self.abort.get().cloned()
    }

    // advance the byte counter and wake all waiters. call only after the sink
    // accepted those n bytes.
    pub(crate) fn advance(&self, n: u64) {
        self.written.fetch_add(n, Relaxed);
        self.notify_all();
    }

    // wake every registered waiter. never blocks on waiter behavior: delivery is a
    // flag set plus invoking a parked waker if there is one.
    pub(crate) fn notify_all(&self) {
        let mut waiters = self.waiters.lock().unwrap();
        for slot in waiters.slots.values_mut() {
            slot.notified = true;
            if let Some(waker) = slot.waker.take() {
                waker.wake();
            }
        }
    }

    // flag the stream canceled, then wake everyone so blocked reads observe it.
    pub(crate) fn cancel(&self) {
        self.canceled.store(true, Relaxed);
        self.notify_all();
    }

    // flag the stream closed and retire the registry: every current waiter is woken
    // and every future wait resolves immediately.
    pub(crate) fn close(&self) {
        self.closed.store(true, Relaxed);
        let mut waiters = self.waiters.lock().unwrap();
        waiters.closed = true;
        for (_, slot) in waiters.slots.drain() {
            if let Some(waker) = slot.waker {
                waker.wake();
            }
        }
    }

    // register a new wake slot. subscribing after close yields a handle whose waits
    // all resolve immediately.
    pub(crate) fn subscribe(self: &Arc<Self>) -> Subscription {
        let mut waiters = self.waiters.lock().unwrap();
        let id = waiters.next_id;
        waiters.next_id += 1;
        if !waiters.closed {
            waiters.slots.insert(id, Slot::default());
        }
        drop(waiters);
        Subscription { shared: Arc::clone(self), id }
    }
}

/// Wake handle registered with a stream's writer.
///
/// Obtained from [`Progress::subscribe`][crate::Progress::subscribe]. Holding one does
/// not keep bytes alive or exert backpressure on the writer; it is purely a signal
/// that the stream changed. Dropping it deregisters the slot.
pub struct Subscription {
    shared: Arc<Shared>,
    id: u64,
}

impl Subscription {
    /// Wait until the writer signals a change: bytes were written, or the stream was
    /// closed or canceled.
    ///
    /// Signals are coalesced — any number of writes between two `changed` calls
    /// collapse into one resolution — so after resolving, consult
    /// [`Progress`][crate::Progress] to learn what actually happened. Once the stream
    /// is closed this resolves immediately, forever.
    pub fn changed(&mut self) -> Changed<'_> {
        Changed { sub: self }
    }

    fn poll_changed(&mut self, cx: &mut Context) -> Poll<()> {
        let mut waiters = self.shared.waiters.lock().unwrap();
        if waiters.closed {
            return Poll::Ready(());
        }
        // with the lock held and the registry not closed, our slot exists
        let slot = waiters.slots.get_mut(&self.id).expect("wake slot missing");
        if slot.notified {
            slot.notified = false;
            return Poll::Ready(());
        }
        slot.waker = Some(cx.waker().clone());
        Poll::Pending
    }

    // reader park path: under the registry lock, resolve immediately if the byte
    // counter moved past `seen` or the stream closed, otherwise park a waker. the
    // pending flag is consumed when parking so a wake already absorbed by the
    // counter comparison cannot fire a second, empty iteration.
    pub(crate) fn poll_wait(&mut self, cx: &mut Context, seen: u64) -> Poll<Wake> {
        let mut waiters = self.shared.waiters.lock().unwrap();
        if self.shared.written.load(Relaxed) > seen {
            return Poll::Ready(Wake::Advanced);
        }
        if waiters.closed {
            return Poll::Ready(Wake::Closed);
        }
        let slot = waiters.slots.get_mut(&self.id).expect("wake slot missing");
        slot.notified = false;
        slot.waker = Some(cx.waker().clone());
        Poll::Pending
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // idempotent with close having already drained the registry
        let mut waiters = self.shared.waiters.lock().unwrap();
        waiters.slots.remove(&self.id);
    }
}

/// Future returned by [`Subscription::changed`].
pub struct Changed<'a> {
    sub: &'a mut Subscription,
}

impl<'a> Future for Changed<'a> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context) -> Poll<()> {
        self.get_mut().sub.poll_changed(cx)
    }
}
