// per-wait deadline / cancellation arming for blocked reads.
//
// bounds are configured on the reader and persist until changed; each blocking wait
// arms its own sleep / token future from them, so a fired bound releases exactly the
// wait in progress and nothing else.

use super::error::{WaitCanceledError, WaitTimedOutError};
use std::{
    future::Future,
    io,
    pin::Pin,
    task::{Poll, Context},
};
use tokio::time::{sleep_until, Instant, Sleep};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};


// wait bounds configured on a reader.
#[derive(Default)]
pub(crate) struct WaitBounds {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl WaitBounds {
    pub(crate) fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    pub(crate) fn set_cancel(&mut self, token: Option<CancellationToken>) {
        self.cancel = token;
    }

    // arm the configured bounds for one blocking wait. None when unbounded.
    pub(crate) fn arm(&self) -> Option<ArmedWait> {
        if self.deadline.is_none() && self.cancel.is_none() {
            return None;
        }
        Some(ArmedWait {
            sleep: self.deadline.map(|at| Box::pin(sleep_until(at))),
            canceled: self.cancel.clone().map(|t| Box::pin(t.cancelled_owned())),
        })
    }
}

// a deadline/token pair armed for the wait currently in progress. dropped when the
// wait ends for any reason; the next wait re-arms fresh from the configured bounds.
pub(crate) struct ArmedWait {
    sleep: Option<Pin<Box<Sleep>>>,
    canceled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
}

impl ArmedWait {
    // the error to surface if an external signal releases the wait.
    pub(crate) fn poll_expired(&mut self, cx: &mut Context) -> Poll<io::Error> {
        if let Some(sleep) = self.sleep.as_mut() {
            if sleep.as_mut().poll(cx).is_ready() {
                return Poll::Ready(io::Error::new(io::ErrorKind::TimedOut, WaitTimedOutError));
            }
        }
        if let Some(canceled) = self.canceled.as_mut() {
            if canceled.as_mut().poll(cx).is_ready() {
                return Poll::Ready(io::Error::other(WaitCanceledError));
            }
        }
        Poll::Pending
    }
}
