//! Simulated handlers for the email, pdf and image job types.
//!
//! Each one parses its own payload schema, sleeps for a configurable delay
//! standing in for real I/O, and reports a one-line summary.

use std::time::Duration;

use queue_core::{Job, JobType, PayloadError};
use serde::Deserialize;

use crate::handler::{HandlerFuture, HandlerResult, JobHandler, JobHandlerRegistry};

/// Processing time of each simulated handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedDelays {
    pub email: Duration,
    pub pdf: Duration,
    pub image: Duration,
}

impl Default for SimulatedDelays {
    fn default() -> Self {
        Self {
            email: Duration::from_secs(2),
            pdf: Duration::from_secs(3),
            image: Duration::from_secs(4),
        }
    }
}

impl SimulatedDelays {
    /// The same delay for every job type.
    pub fn uniform(delay: Duration) -> Self {
        Self {
            email: delay,
            pdf: delay,
            image: delay,
        }
    }
}

/// Registry with a handler for every built-in job type.
pub fn builtin_registry(delays: SimulatedDelays) -> JobHandlerRegistry {
    JobHandlerRegistry::new()
        .with(EmailHandler { delay: delays.email })
        .with(PdfHandler { delay: delays.pdf })
        .with(ImageHandler { delay: delays.image })
}

#[derive(Debug, Deserialize)]
struct EmailPayload {
    to: String,
}

/// Sends an email to `payload.to`.
#[derive(Debug, Clone)]
pub struct EmailHandler {
    pub delay: Duration,
}

impl JobHandler for EmailHandler {
    fn job_type(&self) -> JobType {
        JobType::Email
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        Box::pin(send_email(job.payload().parse(), self.delay))
    }
}

async fn send_email(payload: Result<EmailPayload, PayloadError>, delay: Duration) -> HandlerResult {
    let payload = payload?;
    tokio::time::sleep(delay).await;
    Ok(format!("Email sent to {}", payload.to))
}

#[derive(Debug, Deserialize)]
struct PdfPayload {
    filename: String,
}

/// Renders `payload.filename` as a PDF.
#[derive(Debug, Clone)]
pub struct PdfHandler {
    pub delay: Duration,
}

impl JobHandler for PdfHandler {
    fn job_type(&self) -> JobType {
        JobType::Pdf
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        Box::pin(render_pdf(job.payload().parse(), self.delay))
    }
}

async fn render_pdf(payload: Result<PdfPayload, PayloadError>, delay: Duration) -> HandlerResult {
    let payload = payload?;
    tokio::time::sleep(delay).await;
    Ok(format!("PDF generated: {}", payload.filename))
}

#[derive(Debug, Deserialize)]
struct ImagePayload {
    url: String,
}

/// Processes the image at `payload.url`.
#[derive(Debug, Clone)]
pub struct ImageHandler {
    pub delay: Duration,
}

impl JobHandler for ImageHandler {
    fn job_type(&self) -> JobType {
        JobType::Image
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        Box::pin(process_image(job.payload().parse(), self.delay))
    }
}

async fn process_image(payload: Result<ImagePayload, PayloadError>, delay: Duration) -> HandlerResult {
    let payload = payload?;
    tokio::time::sleep(delay).await;
    Ok(format!("Image processed: {}", payload.url))
}
