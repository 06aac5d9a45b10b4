//! Core domain types for the job queue system.
//!
//! This crate contains shared types used across all packages:
//! - Job, its identifier, type and lifecycle state
//! - JobPayload for opaque submitter data
//! - JobStats for aggregate counts

mod job;
mod payload;
mod stats;

pub use job::{
    InvalidJobRecord, Job, JobId, JobState, JobStatus, JobType, TransitionError, UnknownJobType,
};
pub use payload::{JobPayload, PayloadError};
pub use stats::JobStats;
