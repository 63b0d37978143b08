// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory job registry.
//!
//! One mutex guards the whole map, so the admission count and the set of
//! registered jobs can never disagree. The lock is only ever held for
//! in-memory work; directory I/O happens outside it.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use texel_core::{Job, JobId, JobSnapshot, JobStatus};

use crate::error::EngineError;

/// Thread-safe mapping from job id to job record.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job, failing on duplicate ids.
    pub fn insert(&self, job: Job) -> Result<(), EngineError> {
        let mut jobs = self.jobs.lock();
        if jobs.contains_key(&job.id) {
            return Err(EngineError::Rejected(format!("duplicate job id {}", job.id)));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    /// Admission-controlled insert: counts active jobs and inserts under the
    /// same lock acquisition, so the cap can never be raced past.
    pub fn admit(&self, job: Job, max_concurrent: usize) -> Result<(), EngineError> {
        let mut jobs = self.jobs.lock();
        let active = jobs.values().filter(|j| j.status.is_active()).count();
        if active >= max_concurrent {
            return Err(EngineError::CapacityExceeded);
        }
        if jobs.contains_key(&job.id) {
            return Err(EngineError::Rejected(format!("duplicate job id {}", job.id)));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    /// Jobs counting against the admission cap.
    pub fn active_count(&self) -> usize {
        self.jobs.lock().values().filter(|j| j.status.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.jobs.lock().contains_key(id)
    }

    /// Run `f` against the job under the lock. Returns `None` when the id
    /// is unknown.
    pub fn with_job<R>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> R) -> Option<R> {
        self.jobs.lock().get_mut(id).map(f)
    }

    /// Consistent clone of the record.
    pub fn job_clone(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().get(id).cloned()
    }

    /// Serializable status snapshot.
    pub fn snapshot(&self, id: &JobId, now_ms: u64) -> Option<JobSnapshot> {
        self.with_job(id, |job| job.snapshot(now_ms))
    }

    /// Clones of all jobs matching `filter`.
    pub fn list(&self, filter: impl Fn(&Job) -> bool) -> Vec<Job> {
        self.jobs.lock().values().filter(|j| filter(j)).cloned().collect()
    }

    pub fn remove(&self, id: &JobId) -> Option<Job> {
        self.jobs.lock().remove(id)
    }

    /// Transition every terminal job past its retention window to `cleaned`
    /// and hand back the directories to delete (outside the lock).
    pub fn expire_terminal(&self, now_ms: u64, retention_ms: u64) -> Vec<(JobId, PathBuf, PathBuf)> {
        let mut jobs = self.jobs.lock();
        let mut expired = Vec::new();
        for job in jobs.values_mut() {
            if job.status == JobStatus::Cleaned || !job.status.is_terminal() {
                continue;
            }
            let terminal_at = job.completed_at_ms.unwrap_or(job.created_at_ms);
            if terminal_at + retention_ms <= now_ms && job.transition(JobStatus::Cleaned, now_ms) {
                expired.push((job.id.clone(), job.work_dir.clone(), job.output_dir.clone()));
            }
        }
        expired
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
