//! Concurrency core of the job queue.
//!
//! # Architecture
//!
//! - `JobStore` - Read/write-locked index of every job by ID
//! - `JobQueue` - Bounded channel that records jobs in the store on admission
//! - `WorkerPool` - Fixed number of loops pulling from the queue and running handlers
//! - `JobHandlerRegistry` - Maps each job type to the handler that executes it
//!
//! # Usage
//!
//! ```ignore
//! use workers::{JobQueue, JobStore, WorkerPool, builtin_registry, SimulatedDelays};
//! use tokio_util::sync::CancellationToken;
//!
//! let queue = JobQueue::new(100, JobStore::new());
//! let pool = WorkerPool::new(5, queue.clone(), builtin_registry(SimulatedDelays::default()));
//! let handle = pool.start(CancellationToken::new());
//!
//! queue.enqueue(job).await?;
//! handle.shutdown(Duration::from_secs(5)).await?;
//! ```

mod builtin;
mod handler;
mod pool;
mod queue;
mod store;

pub use builtin::{EmailHandler, ImageHandler, PdfHandler, SimulatedDelays, builtin_registry};
pub use handler::{FnHandler, HandlerError, HandlerFuture, HandlerResult, JobHandler, JobHandlerRegistry};
pub use pool::{EMPTY_ERROR, EMPTY_RESULT, PoolError, PoolHandle, WorkerPool};
pub use queue::{JobQueue, JobReceiver, QueueError};
pub use store::JobStore;

/// Re-export the cancellation primitive the pool is driven by.
pub use tokio_util::sync::CancellationToken;
