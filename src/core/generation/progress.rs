//! Incremental persistence of job and batch transitions
//!
//! Every transition is written as it happens so a caller polling the store
//! sees live progress. Writes after batch creation never abort a job: a
//! failed write is logged and the job carries on. A transition the stored
//! status does not allow is skipped with a warning.

use crate::adapters::store::{from_record, to_record, EntityType, Record, RecordStore};
use crate::domain::errors::StoreError;
use crate::domain::ids::{BatchId, JobId};
use crate::domain::job::{BatchStatus, GenerationBatch, GenerationJob, JobStatus};
use crate::domain::result::Result;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Batch record plus its jobs, read back from the store
#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub batch: GenerationBatch,
    pub jobs: Vec<GenerationJob>,
}

impl BatchSnapshot {
    pub fn status(&self) -> BatchStatus {
        self.batch.status
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }
}

/// Status enums whose stored value guards the next write
trait Lifecycle: Copy + fmt::Display + DeserializeOwned {
    fn allows(&self, next: Self) -> bool;
}

impl Lifecycle for JobStatus {
    fn allows(&self, next: Self) -> bool {
        self.can_transition_to(next)
    }
}

impl Lifecycle for BatchStatus {
    fn allows(&self, next: Self) -> bool {
        self.can_transition_to(next)
    }
}

/// Writes job and batch transitions to a [`RecordStore`]
#[derive(Clone)]
pub struct ProgressRecorder {
    store: Arc<dyn RecordStore>,
}

impl ProgressRecorder {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Inserts the batch, then its pending jobs
    ///
    /// Every stored job is reachable from the stored batch. If a job insert
    /// fails the batch is marked failed before the error is returned.
    ///
    /// # Errors
    ///
    /// Unlike later transitions, a failed insert is returned: a batch whose
    /// records do not exist must not be dispatched.
    pub async fn create_batch(&self, batch: &GenerationBatch, jobs: &[GenerationJob]) -> Result<()> {
        self.store.insert(EntityType::Batch, to_record(batch)?).await?;

        for job in jobs {
            let inserted = match to_record(job) {
                Ok(record) => self.store.insert(EntityType::Job, record).await,
                Err(e) => Err(e),
            };
            if let Err(e) = inserted {
                tracing::error!(batch_id = %batch.id, job_id = %job.id, error = %e, "Failed to persist job");
                self.batch_finished(&batch.id, BatchStatus::Failed).await;
                return Err(e.into());
            }
        }
        Ok(())
    }

    pub async fn batch_running(&self, batch_id: &BatchId) {
        self.transition(
            EntityType::Batch,
            &batch_id.to_string(),
            BatchStatus::Running,
            json!({ "status": BatchStatus::Running }),
        )
        .await;
    }

    pub async fn batch_finished(&self, batch_id: &BatchId, status: BatchStatus) {
        self.transition(
            EntityType::Batch,
            &batch_id.to_string(),
            status,
            json!({ "status": status, "completed_at": Utc::now() }),
        )
        .await;
    }

    pub async fn job_started(&self, job_id: &JobId) {
        self.transition(
            EntityType::Job,
            &job_id.to_string(),
            JobStatus::Generating,
            json!({ "status": JobStatus::Generating, "started_at": Utc::now() }),
        )
        .await;
    }

    pub async fn job_completed(&self, job_id: &JobId, ciphertext: &str, model: &str, attempts: u32) {
        self.transition(
            EntityType::Job,
            &job_id.to_string(),
            JobStatus::Completed,
            json!({
                "status": JobStatus::Completed,
                "result_ciphertext": ciphertext,
                "model": model,
                "attempts": attempts,
                "error_message": Value::Null,
                "completed_at": Utc::now(),
            }),
        )
        .await;
    }

    pub async fn job_failed(&self, job_id: &JobId, error: &str, model: Option<&str>, attempts: u32) {
        self.transition(
            EntityType::Job,
            &job_id.to_string(),
            JobStatus::Failed,
            json!({
                "status": JobStatus::Failed,
                "error_message": error,
                "model": model,
                "attempts": attempts,
                "completed_at": Utc::now(),
            }),
        )
        .await;
    }

    /// Reads a batch and its jobs back in dispatch order
    ///
    /// # Errors
    ///
    /// Returns a store error if the batch or one of its jobs is missing or
    /// cannot be decoded.
    pub async fn snapshot(&self, batch_id: &BatchId) -> Result<BatchSnapshot> {
        let batch: GenerationBatch =
            from_record(self.store.get(EntityType::Batch, &batch_id.to_string()).await?)?;

        let mut jobs = Vec::with_capacity(batch.job_ids.len());
        for job_id in &batch.job_ids {
            let record = self.store.get(EntityType::Job, &job_id.to_string()).await?;
            jobs.push(from_record::<GenerationJob>(record)?);
        }

        Ok(BatchSnapshot { batch, jobs })
    }

    /// Writes `fields` only if the stored status may move to `next`
    async fn transition<S: Lifecycle>(&self, entity: EntityType, id: &str, next: S, fields: Value) {
        let current = match self.store.get(entity, id).await {
            Ok(record) => stored_status::<S>(&record),
            Err(e) => {
                log_write_failure(entity, id, &e);
                return;
            }
        };

        match current {
            Some(current) if current.allows(next) => {}
            Some(current) => {
                tracing::warn!(
                    entity = %entity,
                    id = %id,
                    from = %current,
                    to = %next,
                    "Skipping illegal status transition"
                );
                return;
            }
            None => {
                tracing::warn!(entity = %entity, id = %id, "Stored record has no readable status");
                return;
            }
        }

        let fields = match fields {
            Value::Object(map) => map,
            _ => Record::new(),
        };
        if let Err(e) = self.store.update(entity, id, fields).await {
            log_write_failure(entity, id, &e);
        }
    }
}

fn stored_status<S: Lifecycle>(record: &Record) -> Option<S> {
    record
        .get("status")
        .cloned()
        .and_then(|status| serde_json::from_value(status).ok())
}

fn log_write_failure(entity: EntityType, id: &str, error: &StoreError) {
    tracing::warn!(
        entity = %entity,
        id = %id,
        error = %error,
        "Failed to persist progress"
    );
}
