//! Authoritative in-memory record of every known job.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use queue_core::{Job, JobId, JobStats};

/// Job index shared between the API, the queue and the workers.
///
/// Cloning a `JobStore` yields another handle to the same index. Readers run
/// concurrently; a writer holds the lock only for the single map mutation.
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for `job.id()`.
    pub fn put(&self, job: Job) {
        self.write().insert(job.id(), job);
    }

    /// Look up a job by ID.
    pub fn get(&self, id: JobId) -> Option<Job> {
        self.read().get(&id).cloned()
    }

    /// Snapshot of all jobs in unspecified order.
    pub fn list(&self) -> Vec<Job> {
        self.read().values().cloned().collect()
    }

    /// Per-status counts over the current contents.
    pub fn stats(&self) -> JobStats {
        self.read().values().map(Job::status).collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Critical sections never panic, so a poisoned lock still holds a consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for JobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobStore").field("jobs", &self.len()).finish()
    }
}
