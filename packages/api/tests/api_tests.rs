#![allow(clippy::disallowed_methods)]

use std::error::Error;
use std::time::Duration;

use api::{
    AppState, Job, JobQueueConfig, JobStatus, JobSystem, JobType, init_job_queue, router,
};
use axum::Router;
use queue_core::JobPayload;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use workers::{CancellationToken, SimulatedDelays};

const DELAY: Duration = Duration::from_millis(20);

fn app() -> (Router, JobSystem) {
    let config = JobQueueConfig::default()
        .with_workers(2)
        .with_queue_capacity(16)
        .with_delays(SimulatedDelays::uniform(DELAY));
    let system = init_job_queue(config, CancellationToken::new());
    (router(AppState::new(system.queue.clone())), system)
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Vec<u8>), Box<dyn Error>> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, bytes.to_vec()))
}

async fn get_json(app: &Router, uri: &str) -> Result<(StatusCode, Value), Box<dyn Error>> {
    let request = Request::get(uri).body(Body::empty())?;
    let (status, body) = send(app, request).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

async fn post_job(app: &Router, body: impl Into<Body>) -> Result<(StatusCode, Value), Box<dyn Error>> {
    let request = Request::post("/api/jobs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())?;
    let (status, body) = send(app, request).await?;
    Ok((status, serde_json::from_slice(&body)?))
}

#[tokio::test]
async fn email_job_is_accepted_then_completes() -> Result<(), Box<dyn Error>> {
    let (app, system) = app();

    let body = json!({ "type": "email", "payload": { "to": "a@b.com" } }).to_string();
    let (status, created) = post_job(&app, body).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["type"], "email");
    assert_eq!(created["payload"]["to"], "a@b.com");
    assert!(created.get("started_at").is_none());

    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/jobs/{id}");

    let mut job = None;
    for _ in 0..200 {
        let (status, value) = get_json(&app, &uri).await?;
        assert_eq!(status, StatusCode::OK);
        if value["status"] == "completed" {
            job = Some(value);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let value = job.expect("job never completed");

    assert!(value["result"].as_str().unwrap().contains("a@b.com"));
    assert!(value.get("error").is_none());
    let job: Job = serde_json::from_value(value)?;
    assert_eq!(job.status(), JobStatus::Completed);
    assert!(job.ended_at().unwrap() >= job.started_at().unwrap());

    system.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn unknown_type_is_rejected_without_creating_a_job() -> Result<(), Box<dyn Error>> {
    let (app, _system) = app();

    let (_, before) = get_json(&app, "/api/metrics").await?;
    let (status, body) = post_job(&app, json!({ "type": "bogus" }).to_string()).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("bogus"));

    let (_, after) = get_json(&app, "/api/metrics").await?;
    assert_eq!(after["total"], before["total"]);
    assert_eq!(after["total"], 0);
    Ok(())
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() -> Result<(), Box<dyn Error>> {
    let (app, system) = app();

    for body in [
        "not json".to_string(),
        json!({ "payload": {} }).to_string(),
        json!({ "type": "email", "payload": [1, 2] }).to_string(),
        json!({ "type": 3 }).to_string(),
    ] {
        let (status, value) = post_job(&app, body.clone()).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        assert!(value["error"].is_string());
    }
    assert!(system.queue.store().is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_payload_is_accepted_and_fails_during_processing() -> Result<(), Box<dyn Error>> {
    let (app, system) = app();

    let (status, created) = post_job(&app, json!({ "type": "pdf" }).to_string()).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["payload"], json!({}));

    let id: api::JobId = created["id"].as_str().unwrap().parse()?;
    for _ in 0..200 {
        if system.queue.store().stats().failed == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let job = system.queue.store().get(id).unwrap();
    assert_eq!(job.status(), JobStatus::Failed);
    assert!(job.error().unwrap().contains("filename"));
    Ok(())
}

#[tokio::test]
async fn unknown_and_unparseable_ids_are_not_found() -> Result<(), Box<dyn Error>> {
    let (app, _system) = app();

    let (status, body) = get_json(&app, &format!("/api/jobs/{}", api::JobId::new())).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found");

    let (status, _) = get_json(&app, "/api/jobs/not-an-id").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn list_and_metrics_agree_at_rest() -> Result<(), Box<dyn Error>> {
    let (app, system) = app();

    for (ty, key, value) in [
        ("email", "to", "x@y.z"),
        ("pdf", "filename", "report.pdf"),
        ("image", "url", "http://img/1.png"),
    ] {
        let mut payload = serde_json::Map::new();
        payload.insert(key.to_string(), json!(value));
        let body = json!({ "type": ty, "payload": payload }).to_string();
        let (status, _) = post_job(&app, body).await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let mut metrics = Value::Null;
    for _ in 0..200 {
        (_, metrics) = get_json(&app, "/api/metrics").await?;
        if metrics["completed"] == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        metrics,
        json!({ "total": 3, "pending": 0, "running": 0, "completed": 3, "failed": 0 })
    );

    let (status, list) = get_json(&app, "/api/jobs").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 3);

    system.shutdown(Duration::from_secs(1)).await?;
    Ok(())
}

#[tokio::test]
async fn submissions_after_shutdown_are_unavailable() -> Result<(), Box<dyn Error>> {
    let (app, system) = app();
    system.shutdown(Duration::from_secs(1)).await?;

    let body = json!({ "type": "email", "payload": { "to": "a@b.com" } }).to_string();
    let (status, _) = post_job(&app, body).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(system.queue.store().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_releases_submissions_waiting_on_a_full_queue() -> Result<(), Box<dyn Error>> {
    let config = JobQueueConfig::default()
        .with_workers(1)
        .with_queue_capacity(1)
        .with_delays(SimulatedDelays::uniform(Duration::from_millis(300)));
    let system = init_job_queue(config, CancellationToken::new());
    let email = |to: &str| Job::new(JobType::Email, JobPayload::new().with("to", to));

    system.queue.enqueue(email("busy@b.com")).await?;
    for _ in 0..200 {
        if system.queue.store().stats().running == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    system.queue.enqueue(email("buffered@b.com")).await?;

    let waiting = email("waiting@b.com");
    let blocked = tokio::spawn({
        let queue = system.queue.clone();
        let waiting = waiting.clone();
        async move { queue.enqueue(waiting).await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!blocked.is_finished());

    system.shutdown(Duration::from_secs(1)).await?;
    let outcome = tokio::time::timeout(Duration::from_secs(1), blocked).await??;
    assert_eq!(outcome, Err(workers::QueueError::Closed));
    assert!(system.queue.store().get(waiting.id()).is_none());

    let stats = system.queue.store().stats();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.pending, 1);
    Ok(())
}

#[tokio::test]
async fn health_is_independent_of_the_queue() -> Result<(), Box<dyn Error>> {
    let (app, system) = app();
    system.shutdown(Duration::from_secs(1)).await?;

    let (status, body) = send(&app, Request::get("/health").body(Body::empty())?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
    Ok(())
}
