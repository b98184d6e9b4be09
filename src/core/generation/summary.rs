//! Batch and job results

use crate::domain::ids::{BatchId, JobId};
use crate::domain::job::{BatchStatus, JobStatus};
use serde::Serialize;
use std::time::Duration;

/// Terminal outcome of one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub section: String,
    pub status: JobStatus,
    pub error: Option<String>,
    /// Encrypted, de-anonymized generated text
    pub result_ciphertext: Option<String>,
    pub model: Option<String>,
    pub attempts: u32,
}

impl JobResult {
    pub(crate) fn failed(job_id: JobId, section: &str, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            job_id,
            section: section.to_string(),
            status: JobStatus::Failed,
            error: Some(error.into()),
            result_ciphertext: None,
            model: None,
            attempts,
        }
    }
}

/// Job counts by terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JobCounts {
    pub completed: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }
}

/// Outcome of one orchestrator run
///
/// `jobs` keeps dispatch order regardless of completion order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_id: BatchId,
    pub final_status: BatchStatus,
    pub jobs: Vec<JobResult>,
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
}

impl BatchResult {
    pub fn counts(&self) -> JobCounts {
        self.jobs.iter().fold(JobCounts::default(), |mut counts, job| {
            match job.status {
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
                JobStatus::Pending | JobStatus::Generating => {}
            }
            counts
        })
    }

    /// Completed with at least one failed section
    pub fn is_partial(&self) -> bool {
        self.final_status == BatchStatus::Completed && self.counts().failed > 0
    }

    pub fn job(&self, section: &str) -> Option<&JobResult> {
        self.jobs.iter().find(|j| j.section == section)
    }

    /// Log the summary
    pub fn log_summary(&self) {
        let counts = self.counts();
        tracing::info!(
            batch_id = %self.batch_id,
            status = %self.final_status,
            total = counts.total(),
            completed = counts.completed,
            failed = counts.failed,
            duration_ms = self.duration.as_millis() as u64,
            "Generation batch summary"
        );

        for job in self.jobs.iter().filter(|j| j.status == JobStatus::Failed) {
            tracing::warn!(
                batch_id = %self.batch_id,
                job_id = %job.job_id,
                section = %job.section,
                attempts = job.attempts,
                error = job.error.as_deref().unwrap_or("unknown"),
                "Section failed"
            );
        }
    }
}

fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(section: &str) -> JobResult {
        JobResult {
            job_id: JobId::new(),
            section: section.to_string(),
            status: JobStatus::Completed,
            error: None,
            result_ciphertext: Some("ct".to_string()),
            model: Some("m".to_string()),
            attempts: 1,
        }
    }

    #[test]
    fn test_counts_and_partial() {
        let result = BatchResult {
            batch_id: BatchId::new(),
            final_status: BatchStatus::Completed,
            jobs: vec![
                completed("subjective"),
                JobResult::failed(JobId::new(), "plan", "boom", 4),
            ],
            duration: Duration::from_secs(3),
        };

        assert_eq!(result.counts(), JobCounts { completed: 1, failed: 1 });
        assert!(result.is_partial());
        assert_eq!(result.job("plan").unwrap().attempts, 4);
        assert!(result.job("missing").is_none());
    }

    #[test]
    fn test_serializes_duration_as_millis() {
        let result = BatchResult {
            batch_id: BatchId::new(),
            final_status: BatchStatus::Completed,
            jobs: vec![completed("a")],
            duration: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration_ms"], 1500);
        assert_eq!(json["final_status"], "completed");
        assert_eq!(json["jobs"][0]["status"], "completed");
    }
}
