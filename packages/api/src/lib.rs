//! HTTP API for the job queue system.
//!
//! Routes:
//! - `POST /api/jobs` - Submit a job
//! - `GET /api/jobs` - List all jobs
//! - `GET /api/jobs/{id}` - Look up one job
//! - `GET /api/metrics` - Job counts per status
//! - `GET /health` - Liveness probe

mod error;
mod init;
mod jobs;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;
use workers::JobQueue;

pub use error::ApiError;
pub use init::{JobQueueConfig, JobSystem, init_job_queue};
pub use jobs::CreateJobRequest;

// Re-export core types for convenience
pub use queue_core::{Job, JobId, JobStats, JobStatus, JobType};

/// Shared state handed to every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub queue: JobQueue,
}

impl AppState {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::create_job))
        .route("/api/jobs/{id}", get(jobs::get_job))
        .route("/api/metrics", get(jobs::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
