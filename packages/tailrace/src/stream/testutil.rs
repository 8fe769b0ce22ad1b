// test fixtures: an in-memory append-only stream whose sink and sources honor the
// durability contract exactly (a completed write is immediately readable), so
// protocol interleavings can be driven deterministically at poll level.

use std::{
    future::Future,
    io,
    pin::Pin,
    sync::{Arc, Mutex},
    task::{Poll, Context},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};


// a fresh in-memory stream: the one sink handle plus a factory for sources.
pub(crate) fn mem_stream() -> (MemSink, MemBuf) {
    let inner = Arc::new(Mutex::new(Inner {
        data: Vec::new(),
        fail_write: None,
    }));
    (MemSink { inner: Arc::clone(&inner) }, MemBuf(inner))
}

struct Inner {
    data: Vec<u8>,
    fail_write: Option<io::Error>,
}

// handle onto the backing buffer.
pub(crate) struct MemBuf(Arc<Mutex<Inner>>);

impl MemBuf {
    // a new independently positioned source over the buffer, starting at byte zero.
    pub(crate) fn source(&self) -> MemSource {
        MemSource {
            inner: Arc::clone(&self.0),
            pos: 0,
            fail_read: Mutex::new(None),
        }
    }

    pub(crate) fn contents(&self) -> Vec<u8> {
        self.0.lock().unwrap().data.clone()
    }
}

// append-only sink. writes land in full and are readable the moment they return.
pub(crate) struct MemSink {
    inner: Arc<Mutex<Inner>>,
}

impl MemSink {
    // make the next write fail with err; the write after that succeeds again.
    pub(crate) fn fail_next(&self, err: io::Error) {
        self.inner.lock().unwrap().fail_write = Some(err);
    }
}

impl AsyncWrite for MemSink {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context, buf: &[u8]) -> Poll<io::Result<usize>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(err) = inner.fail_write.take() {
            return Poll::Ready(Err(err));
        }
        inner.data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// one reader's view of the buffer. zero bytes filled means temporary end.
pub(crate) struct MemSource {
    inner: Arc<Mutex<Inner>>,
    pos: usize,
    fail_read: Mutex<Option<io::Error>>,
}

impl MemSource {
    // make the next read fail with err; the read after that succeeds again.
    pub(crate) fn fail_next(&self, err: io::Error) {
        *self.fail_read.lock().unwrap() = Some(err);
    }
}

impl AsyncRead for MemSource {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(err) = this.fail_read.lock().unwrap().take() {
            return Poll::Ready(Err(err));
        }
        let inner = this.inner.lock().unwrap();
        let available = &inner.data[this.pos..];
        if available.is_empty() {
            return Poll::Ready(Ok(()));
        }
        let n = available.len().min(buf.remaining());
        buf.put_slice(&available[..n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

// poll a future exactly once without waiting on it.
pub(crate) async fn poll_once<F>(fut: &mut F) -> Poll<F::Output>
where
    F: Future + Unpin,
{
    std::future::poll_fn(|cx| Poll::Ready(Pin::new(&mut *fut).poll(cx))).await
}
