//! Per-type job execution and the table workers dispatch through.

use queue_core::{Job, JobType, PayloadError};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Failure reported by a handler. The message becomes the job's `error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<PayloadError> for HandlerError {
    fn from(err: PayloadError) -> Self {
        Self(err.to_string())
    }
}

/// What a handler reports: `Ok` becomes the job's `result`.
pub type HandlerResult = Result<String, HandlerError>;

/// Owned, `'static` future so a worker can await it after the job borrow ends.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Executes jobs of one [`JobType`].
///
/// A handler only reads the job; the worker owns its state transitions.
/// Panics are caught by the worker and recorded as a failure.
pub trait JobHandler: Send + Sync + 'static {
    /// Key under which the registry files this handler.
    fn job_type(&self) -> JobType;

    fn handle(&self, job: &Job) -> HandlerFuture;
}

/// One handler per [`JobType`], shared by every worker of a pool.
///
/// Adding a job type means registering a handler here; the worker loop
/// itself never matches on the type. A type with no entry fails its jobs.
#[derive(Default, Clone)]
pub struct JobHandlerRegistry {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl JobHandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// File `handler` under its own [`JobHandler::job_type`], replacing any previous one.
    pub fn register<H: JobHandler>(&mut self, handler: H) {
        self.handlers.insert(handler.job_type(), Arc::new(handler));
    }

    /// Builder form of [`JobHandlerRegistry::register`].
    pub fn with<H: JobHandler>(mut self, handler: H) -> Self {
        self.register(handler);
        self
    }

    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(&job_type).cloned()
    }

    pub fn has_handler(&self, job_type: JobType) -> bool {
        self.handlers.contains_key(&job_type)
    }

    /// Registered types in no particular order.
    pub fn job_types(&self) -> Vec<JobType> {
        self.handlers.keys().copied().collect()
    }
}

impl std::fmt::Debug for JobHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobHandlerRegistry")
            .field("job_types", &self.job_types())
            .finish()
    }
}

/// Handler backed by a closure, mostly for tests and one-off job types.
pub struct FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    job_type: JobType,
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    pub fn new(job_type: JobType, handler: F) -> Self {
        Self { job_type, handler }
    }
}

impl<F> JobHandler for FnHandler<F>
where
    F: Fn(&Job) -> HandlerFuture + Send + Sync + 'static,
{
    fn job_type(&self) -> JobType {
        self.job_type
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        (self.handler)(job)
    }
}
