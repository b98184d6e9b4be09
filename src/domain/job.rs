//! Generation job and batch models
//!
//! A batch is the set of generation jobs sharing one source text and one
//! anonymization map. Each job produces one output section.

use super::identifiers::PatientIdentifiers;
use super::ids::{BatchId, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a single generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet dispatched
    Pending,
    /// Dispatched to the text generation service
    Generating,
    /// Result generated, de-anonymized and encrypted
    Completed,
    /// Terminal failure (retries exhausted, non-retryable error, or cancelled)
    Failed,
}

impl JobStatus {
    /// Whether no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` respects the job lifecycle
    ///
    /// `Pending -> Failed` is allowed for jobs cancelled before dispatch.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Generating)
                | (Self::Pending, Self::Failed)
                | (Self::Generating, Self::Completed)
                | (Self::Generating, Self::Failed)
        )
    }

    /// Persisted string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate status of a generation batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Records created, dispatch not started
    Pending,
    /// Jobs are being dispatched or are in flight
    Running,
    /// At least one job completed
    Completed,
    /// Every job failed
    Failed,
}

impl BatchStatus {
    /// Whether no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` respects the batch lifecycle
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    /// Summarize terminal job states: `Failed` only if every job failed
    ///
    /// Returns `None` while any job is still non-terminal, or when there are
    /// no jobs at all.
    pub fn aggregate<I>(job_statuses: I) -> Option<BatchStatus>
    where
        I: IntoIterator<Item = JobStatus>,
    {
        let mut seen = false;
        let mut any_completed = false;
        for status in job_statuses {
            if !status.is_terminal() {
                return None;
            }
            seen = true;
            any_completed |= status == JobStatus::Completed;
        }
        match (seen, any_completed) {
            (false, _) => None,
            (true, true) => Some(Self::Completed),
            (true, false) => Some(Self::Failed),
        }
    }

    /// Persisted string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specification of one output section to generate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Section name (e.g. "subjective", "assessment")
    pub section: String,

    /// System prompt sent with the anonymized source text
    pub system_prompt: String,

    /// Preferred model; tried before the configured model chain
    #[serde(default)]
    pub model: Option<String>,

    /// Sampling temperature override
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Output token limit override
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl JobSpec {
    /// Creates a job spec with default model settings
    pub fn new(section: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            system_prompt: system_prompt.into(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets the preferred model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the temperature override
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the token limit override
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Input of one orchestrator run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Raw session text (transcript and notes); contains PHI
    pub source_text: String,

    /// Known identifiers of the patient
    pub identifiers: PatientIdentifiers,

    /// One spec per output section, in dispatch order
    pub job_specs: Vec<JobSpec>,

    /// Key used by the submission rate limiter (e.g. user or tenant id)
    pub requester: Option<String>,
}

impl GenerationRequest {
    /// Creates a request without a requester key
    pub fn new(
        source_text: impl Into<String>,
        identifiers: PatientIdentifiers,
        job_specs: Vec<JobSpec>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            identifiers,
            job_specs,
            requester: None,
        }
    }

    /// Sets the requester key
    pub fn for_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = Some(requester.into());
        self
    }
}

/// Persisted state of one generation job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Job id
    pub id: JobId,

    /// Owning batch
    pub batch_id: BatchId,

    /// Section name
    pub section: String,

    /// System prompt
    pub prompt: String,

    /// Current status
    pub status: JobStatus,

    /// Error message of a failed job
    pub error_message: Option<String>,

    /// Encrypted, de-anonymized result of a completed job
    pub result_ciphertext: Option<String>,

    /// Model that produced the result
    pub model: Option<String>,

    /// Number of calls made to the generation service
    pub attempts: u32,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Dispatch time
    pub started_at: Option<DateTime<Utc>>,

    /// Terminal transition time
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// Creates a pending job for a spec
    pub fn pending(batch_id: BatchId, spec: &JobSpec) -> Self {
        Self {
            id: JobId::new(),
            batch_id,
            section: spec.section.clone(),
            prompt: spec.system_prompt.clone(),
            status: JobStatus::Pending,
            error_message: None,
            result_ciphertext: None,
            model: None,
            attempts: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

/// Persisted state of a generation batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationBatch {
    /// Batch id
    pub id: BatchId,

    /// Current status
    pub status: BatchStatus,

    /// Encrypted anonymization map (kept to allow later re-generation)
    pub map_ciphertext: String,

    /// Encrypted source text
    pub source_ciphertext: String,

    /// Jobs in dispatch order
    pub job_ids: Vec<JobId>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Terminal transition time
    pub completed_at: Option<DateTime<Utc>>,
}
