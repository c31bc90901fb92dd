//! Background decoding for `get_many`.
//!
//! One task decodes fetched blocks in input order and publishes a
//! [`Cursor`] per block. The consumer's [`Cursors`] handle owns a
//! cancellation token: cancelling it, or dropping the handle, stops the
//! task after the item it is working on.

use std::sync::Arc;

use bytes::Bytes;
use dagcbor_codec::Transcoder;
use dagcbor_types::Cid;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::error::StoreResult;
use crate::store::load_into;
use crate::traits::Loadable;

/// Outcome of decoding one block.
#[derive(Debug)]
pub struct Cursor<T> {
    pub cid: Cid,
    /// Position of `cid` in the identifiers handed to `get_many`.
    pub index: usize,
    /// The output slot, filled, or why it could not be.
    pub result: StoreResult<T>,
}

/// Result of a `get_many` call.
#[derive(Debug)]
pub struct GetMany<T> {
    /// Identifiers the blockstore did not have.
    pub missing: Vec<Cid>,
    pub cursors: Cursors<T>,
}

/// Receiving end of a `get_many` decode task.
#[derive(Debug)]
pub struct Cursors<T> {
    rx: mpsc::Receiver<Cursor<T>>,
    token: CancellationToken,
}

impl<T> Cursors<T> {
    /// The next decoded block, or `None` once the task has finished or
    /// been cancelled.
    pub async fn next(&mut self) -> Option<Cursor<T>> {
        self.rx.recv().await
    }

    /// Ask the task to stop. Results already queued can still be read.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the fetch has been told to stop.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Read every remaining result.
    pub async fn drain(mut self) -> Vec<Cursor<T>> {
        let mut out = Vec::new();
        while let Some(cursor) = self.next().await {
            out.push(cursor);
        }
        out
    }
}

impl<T> Drop for Cursors<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub(crate) struct Job<T> {
    pub(crate) cid: Cid,
    pub(crate) index: usize,
    pub(crate) bytes: Bytes,
    pub(crate) out: T,
}

pub(crate) fn spawn<T: Loadable + 'static>(
    transcoder: Arc<Transcoder>,
    jobs: Vec<Job<T>>,
    buffer: usize,
) -> Cursors<T> {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let token = CancellationToken::new();
    let worker = token.clone();

    tokio::spawn(async move {
        let total = jobs.len();
        debug!(blocks = total, "get_many worker started");
        for (sent, job) in jobs.into_iter().enumerate() {
            if worker.is_cancelled() {
                debug!(sent, total, "get_many worker cancelled");
                return;
            }
            let Job {
                cid,
                index,
                bytes,
                mut out,
            } = job;
            let result = load_into(&transcoder, &bytes, &mut out).map(|()| out);
            let cursor = Cursor { cid, index, result };
            tokio::select! {
                biased;
                () = worker.cancelled() => {
                    debug!(sent, total, "get_many worker cancelled");
                    return;
                }
                res = tx.send(cursor) => {
                    if res.is_err() {
                        trace!(sent, total, "get_many consumer went away");
                        return;
                    }
                }
            }
        }
        debug!(blocks = total, "get_many worker finished");
    });

    Cursors { rx, token }
}
