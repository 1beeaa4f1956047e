use crate::proxy::ProxySpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Job lifecycle states. Transitions are monotonic:
/// `Queued -> Processing -> {Completed | Failed}` and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for JobStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(()),
        }
    }
}

/// Raw metric values as read from the analytics page.
///
/// Each field is independently nullable: the page sometimes shows only a
/// subset (for tiny domains the backlink widgets can be empty). A response
/// with all three missing is treated as an extraction failure upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricValues {
    pub dr: Option<u64>,
    pub backlinks: Option<u64>,
    pub linking_websites: Option<u64>,
}

impl MetricValues {
    pub fn is_empty(&self) -> bool {
        self.dr.is_none() && self.backlinks.is_none() && self.linking_websites.is_none()
    }
}

/// Success payload returned to clients. This shape is a compatibility
/// contract with existing consumers; do not rename fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainMetrics {
    pub domain: String,
    pub dr: Option<u64>,
    pub backlinks: Option<u64>,
    pub linking_websites: Option<u64>,
    pub elapsed_seconds: f64,
}

impl DomainMetrics {
    pub fn new(domain: impl Into<String>, values: MetricValues, elapsed_seconds: f64) -> Self {
        Self {
            domain: domain.into(),
            dr: values.dr,
            backlinks: values.backlinks,
            linking_websites: values.linking_websites,
            // Two decimals, matching what clients already parse.
            elapsed_seconds: (elapsed_seconds * 100.0).round() / 100.0,
        }
    }
}

/// One unit of work: scrape the metrics for a single domain.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub task_id: Uuid,
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxySpec>,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DomainMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(domain: impl Into<String>, proxy: Option<ProxySpec>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            domain: domain.into(),
            proxy,
            status: JobStatus::Queued,
            result: None,
            error: None,
            submitted_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn summary(&self) -> JobSummary {
        JobSummary {
            task_id: self.task_id,
            domain: self.domain.clone(),
            status: self.status,
            submitted_at: self.submitted_at,
        }
    }
}

/// Compact job view for listings.
#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub task_id: Uuid,
    pub domain: String,
    pub status: JobStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Per-status job tally for /health and /queue.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.queued + self.processing + self.completed + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["queued", "processing", "completed", "failed"] {
            let status: JobStatus = s.parse().unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!("bogus".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_elapsed_is_rounded() {
        let metrics = DomainMetrics::new("example.com", MetricValues::default(), 12.3456);
        assert_eq!(metrics.elapsed_seconds, 12.35);
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = Job::new("example.com", None);
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.started_at.is_none());
        assert!(job.finished_at.is_none());
    }
}
