use std::collections::HashMap;
use std::sync::RwLock;

use authority_scout_common::{DomainMetrics, Job, JobStatus, JobSummary, StatusCounts};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

/// In-memory registry of every job the server has accepted.
///
/// Entries are kept after completion so results stay queryable until an
/// explicit clear. Status transitions are monotonic: queued -> processing ->
/// completed or failed. An attempt to move a job backwards or out of a
/// terminal state is ignored and logged.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        jobs.insert(job.task_id, job);
    }

    pub fn get(&self, task_id: &Uuid) -> Option<Job> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.get(task_id).cloned()
    }

    /// Lists job summaries, optionally filtered by status, newest first.
    pub fn list(&self, status: Option<JobStatus>) -> Vec<JobSummary> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let mut summaries: Vec<JobSummary> = jobs
            .values()
            .filter(|job| status.map_or(true, |s| job.status == s))
            .map(Job::summary)
            .collect();
        summaries.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        summaries
    }

    pub fn counts(&self) -> StatusCounts {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let mut counts = StatusCounts::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Drops every job record. Meant for test tooling resets; a worker still
    /// holding a cleared task id logs and skips when it reports back.
    pub fn clear(&self) -> usize {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let removed = jobs.len();
        jobs.clear();
        removed
    }

    /// Moves a queued job into processing and returns a snapshot of it.
    /// Returns `None` when the job is missing or not queued anymore.
    pub fn mark_processing(&self, task_id: &Uuid) -> Option<Job> {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let job = jobs.get_mut(task_id)?;
        if job.status != JobStatus::Queued {
            warn!(%task_id, status = job.status.as_str(), "refusing to start job not in queued state");
            return None;
        }
        job.status = JobStatus::Processing;
        job.started_at = Some(Utc::now());
        Some(job.clone())
    }

    pub fn mark_completed(&self, task_id: &Uuid, result: DomainMetrics) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let Some(job) = jobs.get_mut(task_id) else {
            warn!(%task_id, "completion for unknown job");
            return;
        };
        if job.status != JobStatus::Processing {
            warn!(%task_id, status = job.status.as_str(), "ignoring completion for job not in processing state");
            return;
        }
        job.status = JobStatus::Completed;
        job.result = Some(result);
        job.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&self, task_id: &Uuid, error: String) {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let Some(job) = jobs.get_mut(task_id) else {
            warn!(%task_id, "failure for unknown job");
            return;
        };
        if job.status != JobStatus::Processing {
            warn!(%task_id, status = job.status.as_str(), "ignoring failure for job not in processing state");
            return;
        }
        job.status = JobStatus::Failed;
        job.error = Some(error);
        job.finished_at = Some(Utc::now());
    }
}
