//! Job domain types for work items in the queue.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::JobPayload;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Kind of work a job performs. Selects the handler that runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Email,
    Pdf,
    Image,
}

impl JobType {
    /// Every accepted job type.
    pub const ALL: [JobType; 3] = [JobType::Email, JobType::Pdf, JobType::Image];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Email => "email",
            JobType::Pdf => "pdf",
            JobType::Image => "image",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejection of a submitted type name that is not a [`JobType`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid job type: {0:?}")]
pub struct UnknownJobType(pub String);

impl FromStr for JobType {
    type Err = UnknownJobType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownJobType(s.to_string()))
    }
}

/// Current status of a job in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is waiting to be picked up by a worker.
    Pending,
    /// Job is currently being executed by a worker.
    Running,
    /// Job completed successfully.
    Completed,
    /// Job failed with an error.
    Failed,
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution record of a job.
///
/// Each variant carries exactly the fields that exist in that state, so a
/// pending job has no start time and only terminal jobs hold a result or an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JobState {
    #[default]
    Pending,
    Running {
        started_at: DateTime<Utc>,
    },
    Completed {
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        result: String,
    },
    Failed {
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        error: String,
    },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Pending => JobStatus::Pending,
            JobState::Running { .. } => JobStatus::Running,
            JobState::Completed { .. } => JobStatus::Completed,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// A transition that the job lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal job transition from {from} to {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// A job represents a unit of work to be executed by the worker pool.
///
/// Identity, type, payload and creation time are fixed at construction. The
/// execution record only moves forward through [`Job::start`],
/// [`Job::complete`] and [`Job::fail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "JobRecord", try_from = "JobRecord")]
pub struct Job {
    id: JobId,
    job_type: JobType,
    payload: JobPayload,
    state: JobState,
    created_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job with a fresh identifier.
    pub fn new(job_type: JobType, payload: JobPayload) -> Self {
        Self {
            id: JobId::new(),
            job_type,
            payload,
            state: JobState::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn payload(&self) -> &JobPayload {
        &self.payload
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When a worker picked the job up. `None` while pending.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            JobState::Pending => None,
            JobState::Running { started_at }
            | JobState::Completed { started_at, .. }
            | JobState::Failed { started_at, .. } => Some(*started_at),
        }
    }

    /// When the job reached a terminal state.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            JobState::Completed { ended_at, .. } | JobState::Failed { ended_at, .. } => {
                Some(*ended_at)
            }
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&str> {
        match &self.state {
            JobState::Completed { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Move a pending job to running.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        match self.state {
            JobState::Pending => {
                self.state = JobState::Running { started_at: now };
                Ok(())
            }
            _ => Err(self.illegal(JobStatus::Running)),
        }
    }

    /// Move a running job to completed with the handler's output.
    pub fn complete(
        &mut self,
        result: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        match self.state {
            JobState::Running { started_at } => {
                self.state = JobState::Completed {
                    started_at,
                    ended_at: now.max(started_at),
                    result: result.into(),
                };
                Ok(())
            }
            _ => Err(self.illegal(JobStatus::Completed)),
        }
    }

    /// Move a running job to failed with the handler's error message.
    pub fn fail(
        &mut self,
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        match self.state {
            JobState::Running { started_at } => {
                self.state = JobState::Failed {
                    started_at,
                    // The wall clock can step backwards between the two reads.
                    ended_at: now.max(started_at),
                    error: error.into(),
                };
                Ok(())
            }
            _ => Err(self.illegal(JobStatus::Failed)),
        }
    }

    fn illegal(&self, to: JobStatus) -> TransitionError {
        TransitionError {
            from: self.status(),
            to,
        }
    }
}

/// A serialized job whose fields contradict its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("inconsistent fields for a {0} job record")]
pub struct InvalidJobRecord(pub JobStatus);

/// Flat wire form of a [`Job`].
#[derive(Debug, Serialize, Deserialize)]
struct JobRecord {
    id: JobId,
    #[serde(rename = "type")]
    job_type: JobType,
    status: JobStatus,
    #[serde(default)]
    payload: JobPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ended_at: Option<DateTime<Utc>>,
}

impl From<Job> for JobRecord {
    fn from(job: Job) -> Self {
        let status = job.status();
        let started_at = job.started_at();
        let ended_at = job.ended_at();
        let (result, error) = match job.state {
            JobState::Completed { result, .. } => (Some(result), None),
            JobState::Failed { error, .. } => (None, Some(error)),
            _ => (None, None),
        };
        Self {
            id: job.id,
            job_type: job.job_type,
            status,
            payload: job.payload,
            result,
            error,
            created_at: job.created_at,
            started_at,
            ended_at,
        }
    }
}

impl TryFrom<JobRecord> for Job {
    type Error = InvalidJobRecord;

    fn try_from(record: JobRecord) -> Result<Self, Self::Error> {
        let state = match (
            record.status,
            record.started_at,
            record.ended_at,
            record.result,
            record.error,
        ) {
            (JobStatus::Pending, None, None, None, None) => JobState::Pending,
            (JobStatus::Running, Some(started_at), None, None, None) => {
                JobState::Running { started_at }
            }
            (JobStatus::Completed, Some(started_at), Some(ended_at), Some(result), None)
                if ended_at >= started_at =>
            {
                JobState::Completed {
                    started_at,
                    ended_at,
                    result,
                }
            }
            (JobStatus::Failed, Some(started_at), Some(ended_at), None, Some(error))
                if ended_at >= started_at =>
            {
                JobState::Failed {
                    started_at,
                    ended_at,
                    error,
                }
            }
            (status, ..) => return Err(InvalidJobRecord(status)),
        };
        Ok(Self {
            id: record.id,
            job_type: record.job_type,
            payload: record.payload,
            state,
            created_at: record.created_at,
        })
    }
}
