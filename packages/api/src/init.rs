//! Server initialization for the job queue system.

use std::time::Duration;

use workers::{
    CancellationToken, JobQueue, JobStore, PoolHandle, SimulatedDelays, WorkerPool,
    builtin_registry,
};

/// Startup parameters of the job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobQueueConfig {
    /// Number of concurrent worker loops.
    pub workers: usize,
    /// Jobs the queue buffers before submissions wait.
    pub queue_capacity: usize,
    /// Processing time of the built-in handlers.
    pub delays: SimulatedDelays,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 100,
            delays: SimulatedDelays::default(),
        }
    }
}

impl JobQueueConfig {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn with_delays(mut self, delays: SimulatedDelays) -> Self {
        self.delays = delays;
        self
    }
}

/// A running job queue: the queue submissions go to and its worker pool.
#[derive(Debug, Clone)]
pub struct JobSystem {
    pub queue: JobQueue,
    pub pool: PoolHandle,
}

impl JobSystem {
    /// Stop admitting jobs, then stop the workers and wait up to `grace` for them.
    pub async fn shutdown(&self, grace: Duration) -> Result<(), workers::PoolError> {
        self.queue.close();
        self.pool.shutdown(grace).await
    }
}

/// Initialize the job queue system.
///
/// This should be called once at server startup, from within the tokio
/// runtime, before handling requests. Workers stop when `cancel` fires.
pub fn init_job_queue(config: JobQueueConfig, cancel: CancellationToken) -> JobSystem {
    tracing::info!(
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        "Initializing job queue system..."
    );

    let queue = JobQueue::new(config.queue_capacity, JobStore::new());
    let handlers = builtin_registry(config.delays);
    tracing::debug!(?handlers, "Registered job handlers");

    let pool = WorkerPool::new(config.workers, queue.clone(), handlers).start(cancel);

    tracing::info!("Job queue system initialized");
    JobSystem { queue, pool }
}
