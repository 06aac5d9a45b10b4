//! Aggregate job counts.

use serde::{Deserialize, Serialize};

use crate::JobStatus;

/// Number of known jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStats {
    pub total: u64,
    pub pending: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

impl JobStats {
    /// Count one job with the given status.
    pub fn record(&mut self, status: JobStatus) {
        self.total += 1;
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Completed => self.completed += 1,
            JobStatus::Failed => self.failed += 1,
        }
    }

    pub fn count(&self, status: JobStatus) -> u64 {
        match status {
            JobStatus::Pending => self.pending,
            JobStatus::Running => self.running,
            JobStatus::Completed => self.completed,
            JobStatus::Failed => self.failed,
        }
    }

    /// Jobs not yet finished (pending + running).
    pub fn active(&self) -> u64 {
        self.pending + self.running
    }

    /// Jobs in a terminal state.
    pub fn processed(&self) -> u64 {
        self.completed + self.failed
    }
}

impl FromIterator<JobStatus> for JobStats {
    fn from_iter<I: IntoIterator<Item = JobStatus>>(iter: I) -> Self {
        let mut stats = Self::default();
        for status in iter {
            stats.record(status);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;

    #[test]
    fn total_is_sum_of_counts() {
        let stats: JobStats = [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Completed,
            JobStatus::Completed,
            JobStatus::Failed,
        ]
        .into_iter()
        .collect();

        assert_eq!(stats.total, 5);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.running, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.active() + stats.processed(), stats.total);
    }

    #[test]
    fn serializes_with_metric_names() {
        let value = serde_json::to_value(JobStats::default()).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        for key in ["total", "pending", "running", "completed", "failed"] {
            assert!(keys.contains(&key));
        }
    }
}
