#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use queue_core::{Job, JobStats, JobType};
use tokio::time::Instant;
use workers::{FnHandler, HandlerError, HandlerFuture, HandlerResult, JobHandler, JobStore};

/// Build a handler from an async function of an owned job.
pub fn handler<F, Fut>(job_type: JobType, f: F) -> impl JobHandler
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler::new(job_type, move |job: &Job| -> HandlerFuture {
        Box::pin(f(job.clone()))
    })
}

pub fn done(result: impl Into<String>) -> HandlerResult {
    Ok(result.into())
}

pub fn failed(error: impl Into<String>) -> HandlerResult {
    Err(HandlerError::new(error))
}

/// Poll the store until `cond` holds for its stats or `timeout` passes.
pub async fn wait_for_stats(
    store: &JobStore,
    timeout: Duration,
    cond: impl Fn(&JobStats) -> bool,
) -> Result<JobStats, String> {
    let deadline = Instant::now() + timeout;
    loop {
        let stats = store.stats();
        if cond(&stats) {
            return Ok(stats);
        }
        if Instant::now() >= deadline {
            return Err(format!("timed out waiting for stats, last seen {stats:?}"));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
