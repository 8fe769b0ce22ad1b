// implementation of the tail-while-write stream.
//
// the architecture is as such:
//
// writer / reader / progress handles wrap around Arc<shared state>
//                                                  |
//          /---------------------------------------/
//          v
//       shared state
//          |
//          |------ atomics: the byte counter plus the closed and canceled flags.
//          |       loads are cheap so the hot paths check them lock-free; any
//          |       decision that could park a task is double-checked under the
//          |       registry mutex.
//          |
//          \------ a mutex around the waiter registry: one slot per subscription,
//                  each holding a binary "wake pending" flag and a parked waker.
//                  notify sets flags and fires wakers without ever blocking on a
//                  waiter, which is what lets the writer call it from its write
//                  path with no backpressure from slow readers.
//
// the organization of these modules is as such:
//
//      core: shared state, the waiter registry, and Subscription, the wake handle.
//            everything here is about who gets woken when, never about bytes.
//
//      writer: AsyncWrite adapter that counts accepted bytes and announces them,
//              plus the terminal transitions (close / abort / cancel) and the
//              Progress observation handle.
//
//      reader: AsyncRead adapter running the temporary-end protocol: terminal
//              flags, source read, park-under-lock, drain-before-end.
//
//      wait: per-wait arming of an optional deadline / cancellation token that can
//            release one blocked read without touching anything shared.
//
// there is also the error module, which contains the relevant error types, which is
// re-exported publically.

pub(crate) mod error;

pub(crate) mod core;
pub(crate) mod reader;
pub(crate) mod wait;
pub(crate) mod writer;

#[cfg(test)]
pub(crate) mod testutil;
