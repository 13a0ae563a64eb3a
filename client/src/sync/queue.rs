//! FIFO operation queue.
//!
//! DESIGN
//! ======
//! Operations are boxed futures sent over an unbounded channel to a single
//! worker task, which awaits each to completion before taking the next.
//! An operation enqueued while another is in flight therefore never starts
//! early, whatever the relative latency of the two.
//!
//! ERROR HANDLING
//! ==============
//! A failed operation is logged at `warn` and dropped. It is never retried
//! and later operations still run. A hung operation stalls the queue; there
//! is no timeout.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::SyncError;

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;

type OpFuture = Pin<Box<dyn Future<Output = Result<(), SyncError>> + Send>>;

struct Op {
    label: String,
    run: OpFuture,
}

enum Job {
    Run(Op),
    Notify(oneshot::Sender<()>),
}

/// Handle to a queue worker. Clones share the same worker.
///
/// The worker exits once every handle is dropped and the backlog is drained.
#[derive(Clone)]
pub struct OpQueue {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
}

impl OpQueue {
    /// Start a worker on the current tokio runtime.
    #[must_use]
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let depth = Arc::new(AtomicUsize::new(0));
        tokio::spawn(run_worker(rx, Arc::clone(&depth)));
        Self { tx, depth }
    }

    /// Append an operation. Returns `false` if the worker is gone.
    pub fn enqueue<F>(&self, label: impl Into<String>, op: F) -> bool
    where
        F: Future<Output = Result<(), SyncError>> + Send + 'static,
    {
        let label = label.into();
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(Job::Run(Op { label: label.clone(), run: Box::pin(op) })).is_ok() {
            return true;
        }
        self.depth.fetch_sub(1, Ordering::SeqCst);
        warn!(%label, "operation queue closed; dropping operation");
        false
    }

    /// Operations enqueued but not yet finished, including the one in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every operation enqueued before this call has finished.
    pub async fn drained(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Notify(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_worker(mut rx: mpsc::UnboundedReceiver<Job>, depth: Arc<AtomicUsize>) {
    while let Some(job) = rx.recv().await {
        let Op { label, run } = match job {
            Job::Run(op) => op,
            Job::Notify(done) => {
                let _ = done.send(());
                continue;
            }
        };
        debug!(%label, "running queued operation");
        if let Err(e) = run.await {
            warn!(%label, error = %e, "queued operation failed");
        }
        depth.fetch_sub(1, Ordering::SeqCst);
    }
    debug!("operation queue drained and closed");
}
