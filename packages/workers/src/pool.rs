//! Fixed-size pool of worker loops draining a [`JobQueue`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use queue_core::{Job, JobStatus};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::handler::JobHandlerRegistry;
use crate::queue::{JobQueue, JobReceiver};
use crate::store::JobStore;

/// Recorded when a handler succeeds with an empty result.
pub const EMPTY_RESULT: &str = "completed with no output";
/// Recorded when a handler fails with an empty message.
pub const EMPTY_ERROR: &str = "failed with no error message";

/// Errors from pool lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("workers did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Runs `size` concurrent worker loops against one queue.
///
/// Each loop takes one job at a time, runs the handler registered for its
/// type to completion, and persists every state transition to the store.
pub struct WorkerPool {
    size: usize,
    queue: JobQueue,
    handlers: Arc<JobHandlerRegistry>,
}

impl WorkerPool {
    pub fn new(size: usize, queue: JobQueue, handlers: JobHandlerRegistry) -> Self {
        Self {
            size,
            queue,
            handlers: Arc::new(handlers),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Spawn the worker loops. They run until `cancel` fires.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, cancel: CancellationToken) -> PoolHandle {
        let tracker = TaskTracker::new();
        for n in 1..=self.size {
            let worker = Worker {
                id: format!("worker-{n}"),
                receiver: self.queue.dequeue(),
                store: self.queue.store().clone(),
                handlers: Arc::clone(&self.handlers),
            };
            tracker.spawn(worker.run(cancel.clone()));
        }
        tracker.close();

        tracing::info!(count = self.size, "Workers started");
        PoolHandle { cancel, tracker }
    }
}

/// Handle to a started pool, used to stop it and wait for its loops.
///
/// Stopping is cooperative: a loop checks the cancellation signal only while
/// waiting for its next job, so a job already being handled runs to the end.
/// Jobs still buffered in the queue stay pending.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl PoolHandle {
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// True once every worker loop has exited.
    pub fn is_finished(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Wait up to `grace` for every worker loop to exit, without signalling them.
    pub async fn join(&self, grace: Duration) -> Result<(), PoolError> {
        tokio::time::timeout(grace, self.tracker.wait())
            .await
            .map_err(|_| PoolError::ShutdownTimeout(grace))
    }

    /// Raise the cancellation signal, then wait up to `grace` for the loops.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), PoolError> {
        tracing::info!(?grace, "Stopping workers");
        self.cancel.cancel();
        self.join(grace).await
    }
}

struct Worker {
    id: String,
    receiver: JobReceiver,
    store: JobStore,
    handlers: Arc<JobHandlerRegistry>,
}

impl Worker {
    async fn run(self, cancel: CancellationToken) {
        tracing::info!(worker_id = %self.id, "Worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                job = self.receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            self.process_job(job).await;
        }

        tracing::info!(worker_id = %self.id, "Worker stopped");
    }

    async fn process_job(&self, mut job: Job) {
        let job_id = job.id();
        if let Err(err) = job.start(Utc::now()) {
            tracing::warn!(%job_id, %err, "Skipping job that is not pending");
            return;
        }
        self.store.put(job.clone());

        tracing::info!(
            %job_id,
            job_type = %job.job_type(),
            worker_id = %self.id,
            "Processing job"
        );

        let outcome = self.execute(&job).await;
        let now = Utc::now();
        let finished = match outcome {
            Ok(result) if result.is_empty() => job.complete(EMPTY_RESULT.to_string(), now),
            Ok(result) => job.complete(result, now),
            Err(error) if error.is_empty() => {
                tracing::error!(%job_id, worker_id = %self.id, "Job failed without a message");
                job.fail(EMPTY_ERROR.to_string(), now)
            }
            Err(error) => {
                tracing::error!(%job_id, worker_id = %self.id, %error, "Job failed");
                job.fail(error, now)
            }
        };
        match finished {
            Ok(()) if job.status() == JobStatus::Completed => {
                let duration_ms = job
                    .ended_at()
                    .zip(job.started_at())
                    .map(|(ended, started)| (ended - started).num_milliseconds())
                    .unwrap_or_default();
                tracing::info!(%job_id, duration_ms, "Job completed");
            }
            Ok(()) => {}
            Err(err) => tracing::error!(%job_id, %err, "Could not record job outcome"),
        }

        self.store.put(job);
    }

    /// Run the job's handler, turning every way it can go wrong into an error message.
    async fn execute(&self, job: &Job) -> Result<String, String> {
        let Some(handler) = self.handlers.get(job.job_type()) else {
            return Err(format!("No handler for job type: {}", job.job_type()));
        };

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(job))) {
            Ok(future) => future,
            Err(_) => return Err("handler panicked".to_string()),
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err("handler panicked".to_string()),
        }
    }
}
