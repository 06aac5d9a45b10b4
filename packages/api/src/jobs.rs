//! Job management endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use queue_core::{Job, JobId, JobPayload, JobStats, JobType};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

/// Request type for creating a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub payload: JobPayload,
}

/// `POST /api/jobs`: admit a new job and return its pending record.
///
/// Waits while the queue is full.
pub async fn create_job(
    State(state): State<AppState>,
    body: Result<Json<CreateJobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let Json(request) = body?;
    let job_type: JobType = request.job_type.parse()?;

    let job = Job::new(job_type, request.payload);
    state.queue.enqueue(job.clone()).await?;

    tracing::info!(job_id = %job.id(), %job_type, "Job created");
    Ok((StatusCode::CREATED, Json(job)))
}

/// `GET /api/jobs`
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.queue.store().list())
}

/// `GET /api/jobs/{id}`
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    let id = JobId::parse(&id).map_err(|_| ApiError::NotFound)?;
    state
        .queue
        .store()
        .get(id)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// `GET /api/metrics`
pub async fn metrics(State(state): State<AppState>) -> Json<JobStats> {
    Json(state.queue.store().stats())
}
