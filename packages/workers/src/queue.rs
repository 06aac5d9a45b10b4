//! Bounded handoff of jobs from submitters to the worker pool.

use std::sync::Arc;

use queue_core::Job;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::store::JobStore;

/// Errors returned when admitting a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue is full")]
    Full,

    #[error("Queue is closed")]
    Closed,
}

/// Receiving end of a [`JobQueue`].
///
/// Clones share one channel. Each job is handed to exactly one caller of
/// [`JobReceiver::recv`], never broadcast.
#[derive(Clone)]
pub struct JobReceiver {
    inner: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl JobReceiver {
    /// Wait for the next job. Cancel-safe: dropping the future loses no job.
    pub async fn recv(&self) -> Option<Job> {
        self.inner.lock().await.recv().await
    }
}

/// Bounded job queue layered on a [`JobStore`].
///
/// A job is recorded in the store only once a channel slot is reserved for
/// it, so it can be looked up as soon as admission returns and an abandoned
/// admission leaves nothing behind.
///
/// # Backpressure
///
/// Capacity is fixed at construction. [`JobQueue::enqueue`] waits while the
/// buffer is full, so a stalled worker pool eventually stalls its callers
/// (including request handlers). Use [`JobQueue::try_enqueue`] to be told
/// instead. [`JobQueue::close`] releases every waiting caller with
/// [`QueueError::Closed`].
#[derive(Clone)]
pub struct JobQueue {
    store: JobStore,
    tx: mpsc::Sender<Job>,
    rx: JobReceiver,
    closed: CancellationToken,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` unclaimed jobs (minimum 1).
    pub fn new(capacity: usize, store: JobStore) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            store,
            tx,
            rx: JobReceiver {
                inner: Arc::new(Mutex::new(rx)),
            },
            closed: CancellationToken::new(),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Jobs waiting in the buffer that no worker has claimed yet.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record the job and hand it to the workers, waiting for a free slot.
    ///
    /// Cancel-safe: if the future is dropped while waiting, the job is
    /// neither recorded nor queued.
    pub async fn enqueue(&self, job: Job) -> Result<(), QueueError> {
        let permit = tokio::select! {
            biased;
            _ = self.closed.cancelled() => return Err(QueueError::Closed),
            permit = self.tx.reserve() => permit.map_err(|_| QueueError::Closed)?,
        };
        self.admit(permit, job);
        Ok(())
    }

    /// Admit the job only if a slot is free right now.
    ///
    /// On `Full` nothing is recorded.
    pub fn try_enqueue(&self, job: Job) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }

        let permit = self.tx.try_reserve().map_err(|e| match e {
            mpsc::error::TrySendError::Full(()) => QueueError::Full,
            mpsc::error::TrySendError::Closed(()) => QueueError::Closed,
        })?;
        self.admit(permit, job);
        Ok(())
    }

    fn admit(&self, permit: mpsc::Permit<'_, Job>, job: Job) {
        let id = job.id();
        self.store.put(job.clone());
        permit.send(job);
        tracing::debug!(job_id = %id, "Job enqueued");
    }

    /// Handle workers pull jobs from.
    pub fn dequeue(&self) -> JobReceiver {
        self.rx.clone()
    }

    /// Stop admitting jobs and wake callers waiting for a slot.
    /// Jobs already buffered stay receivable.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
