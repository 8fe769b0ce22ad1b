// bulk-copy consumer built on the public Progress/Subscription contract: stream a
// still-growing source into a destination until the writer finishes.

use crate::stream::{
    error::{PumpError, WriterCanceledError},
    writer::Progress,
};
use tokio::io::{copy, AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;


/// Stream a still-growing source into `dest` until the writer finishes.
///
/// The workhorse behind serving a file to a client while it is being produced:
/// repeatedly bulk-copies everything currently readable from `source` into `dest`,
/// and at the temporary end of data waits on the stream the way a
/// [`Reader`][crate::Reader] would instead of stopping. `progress` names the stream
/// (from [`Writer::progress`][crate::Writer::progress]); `cancel` is a
/// request-scoped token that stops the pump without touching the writer or anyone
/// else — on an HTTP server, typically the token fired when the client goes away.
///
/// Resolution mirrors the reader's precedence order:
///
/// - `Err(`[`PumpError::Canceled`]`)` — `cancel` fired. Checked first, so a dead
///   request stops pumping even if the writer is also done.
/// - `Err(`[`PumpError::WriterCanceled`]`)` — the writer canceled the stream
///   abruptly; whatever was already copied stays in `dest`.
/// - `Err(`[`PumpError::Aborted`]`)` — the writer aborted: returned only at the
///   true end, after every byte written before the close was copied.
/// - `Err(`[`PumpError::Io`]`)` — `source` or `dest` failed; passed through.
/// - `Ok(total)` — clean close, fully drained; `total` is the bytes transferred.
///
/// `source` should be this pump's own handle positioned where the transfer starts,
/// like a reader's source. `dest` is flushed after each copy round.
pub async fn pump<S, D>(
    source: &mut S,
    dest: &mut D,
    progress: &Progress,
    cancel: &CancellationToken,
) -> Result<u64, PumpError>
where
    S: AsyncRead + Unpin + ?Sized,
    D: AsyncWrite + Unpin + ?Sized,
{
    // subscribe before the first copy so a write landing mid-round leaves a wake
    // behind instead of slipping between the copy and the park
    let mut sub = progress.subscribe();
    let mut total = 0u64;
    loop {
        // sample first: bytes counted during the copy trigger another round rather
        // than a park that would strand them until the next write
        let before = progress.bytes_written();
        let n = copy(&mut *source, &mut *dest).await?;
        total += n;

        // local cancel over writer cancel over closure
        if cancel.is_cancelled() {
            return Err(PumpError::Canceled);
        }
        if progress.is_canceled() {
            return Err(PumpError::WriterCanceled(WriterCanceledError));
        }
        if n > 0 || progress.bytes_written() > before {
            continue;
        }
        if progress.is_closed() {
            // nothing copied and the counter is still: the stream is drained
            return match progress.abort_error() {
                Some(err) => Err(PumpError::Aborted(err)),
                None => Ok(total),
            };
        }

        tokio::select! {
            _ = sub.changed() => {}
            _ = cancel.cancelled() => return Err(PumpError::Canceled),
        }
    }
}
