//! Generation orchestrator
//!
//! Anonymizes a batch once, fans its jobs out to the text generation service
//! under a concurrency cap and a minimum inter-dispatch interval, then
//! de-anonymizes and encrypts each result. Every job reaches a terminal
//! state before [`GenerationOrchestrator::execute`] returns.

use super::progress::ProgressRecorder;
use super::retry::{call_with_retry, ModelChain, RetryPolicy};
use super::summary::{BatchResult, JobResult};
use crate::adapters::store::RecordStore;
use crate::adapters::textgen::{CompletionRequest, TextGenerator};
use crate::anonymization::{deanonymize, AnonymizationMap, Anonymizer};
use crate::config::{GenerationConfig, ScribeConfig};
use crate::crypto::{BlobCodec, FieldCipher};
use crate::domain::errors::ScribeError;
use crate::domain::ids::{BatchId, JobId};
use crate::domain::job::{
    BatchStatus, GenerationBatch, GenerationJob, GenerationRequest, JobSpec, JobStatus,
};
use crate::domain::result::Result;
use crate::{log_batch_complete, log_job_complete, log_job_start};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Error recorded on jobs that were never dispatched because of shutdown
pub const CANCELLED_BEFORE_DISPATCH: &str = "cancelled before dispatch";

/// Dispatch, retry and model settings
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Maximum jobs in flight
    pub max_concurrency: usize,
    /// Minimum delay between successive dispatches
    pub dispatch_interval: Duration,
    /// Overall timeout of each external call
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub models: ModelChain,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl OrchestratorSettings {
    /// # Errors
    ///
    /// Returns a configuration error when no model is configured or the
    /// concurrency cap is zero.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        if config.max_concurrency == 0 {
            return Err(ScribeError::Configuration(
                "generation.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            max_concurrency: config.max_concurrency,
            dispatch_interval: config.dispatch_interval(),
            request_timeout: config.request_timeout(),
            retry: RetryPolicy::from(&config.retry),
            models: ModelChain::new(config.models.iter().cloned())?,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

/// A batch whose records exist and whose text is anonymized, ready to run
pub struct PreparedBatch {
    batch_id: BatchId,
    jobs: Vec<(GenerationJob, JobSpec)>,
    anonymized_text: Arc<str>,
    map: Arc<AnonymizationMap>,
}

impl PreparedBatch {
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.iter().map(|(job, _)| job.id).collect()
    }
}

impl fmt::Debug for PreparedBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedBatch")
            .field("batch_id", &self.batch_id)
            .field("jobs", &self.jobs.len())
            .field("placeholders", &self.map.len())
            .finish()
    }
}

/// State shared read-only by every job task of one batch
struct JobContext {
    batch_id: BatchId,
    generator: Arc<dyn TextGenerator>,
    codec: Arc<dyn BlobCodec>,
    progress: ProgressRecorder,
    settings: Arc<OrchestratorSettings>,
    anonymized_text: Arc<str>,
    map: Arc<AnonymizationMap>,
}

/// Generation orchestrator
///
/// # Example
///
/// ```rust,no_run
/// use phiscribe::adapters::store::MemoryStore;
/// use phiscribe::adapters::textgen::HttpTextGenerator;
/// use phiscribe::config::load_config;
/// use phiscribe::core::generation::GenerationOrchestrator;
/// use phiscribe::domain::{GenerationRequest, JobSpec, PatientIdentifiers};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config("phiscribe.toml")?;
/// let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
///
/// let orchestrator = GenerationOrchestrator::from_config(
///     &config,
///     Arc::new(HttpTextGenerator::new(&config.generation)?),
///     Arc::new(MemoryStore::new()),
///     shutdown_rx,
/// )?;
///
/// let request = GenerationRequest::new(
///     "Session transcript...",
///     PatientIdentifiers::with_name("Jane Roe"),
///     vec![JobSpec::new("assessment", "Write the assessment section")],
/// );
/// let result = orchestrator.run(request).await?;
/// result.log_summary();
/// # Ok(())
/// # }
/// ```
pub struct GenerationOrchestrator {
    generator: Arc<dyn TextGenerator>,
    codec: Arc<dyn BlobCodec>,
    anonymizer: Arc<Anonymizer>,
    progress: ProgressRecorder,
    settings: Arc<OrchestratorSettings>,
    shutdown: watch::Receiver<bool>,
}

impl GenerationOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        codec: Arc<dyn BlobCodec>,
        anonymizer: Anonymizer,
        store: Arc<dyn RecordStore>,
        settings: OrchestratorSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            generator,
            codec,
            anonymizer: Arc::new(anonymizer),
            progress: ProgressRecorder::new(store),
            settings: Arc::new(settings),
            shutdown,
        }
    }

    /// Builds an orchestrator from the full configuration
    ///
    /// # Errors
    ///
    /// Fails fast on a missing or invalid encryption key, an empty model list
    /// or invalid anonymization settings.
    pub fn from_config(
        config: &ScribeConfig,
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RecordStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<Self> {
        let key = config.encryption.encryption_key()?;
        Ok(Self::new(
            generator,
            Arc::new(FieldCipher::new(&key)),
            Anonymizer::new(&config.anonymization)?,
            store,
            OrchestratorSettings::from_config(&config.generation)?,
            shutdown,
        ))
    }

    pub fn progress(&self) -> &ProgressRecorder {
        &self.progress
    }

    /// Anonymizes the request once and persists the batch and its pending jobs
    ///
    /// # Errors
    ///
    /// - [`ScribeError::Validation`] for an empty job list
    /// - [`ScribeError::Configuration`] when the codec holds no key
    /// - crypto or store errors while persisting the batch
    pub async fn prepare(&self, request: GenerationRequest) -> Result<PreparedBatch> {
        if request.job_specs.is_empty() {
            return Err(ScribeError::Validation(
                "a generation request needs at least one job".to_string(),
            ));
        }
        if !self.codec.is_configured() {
            return Err(ScribeError::Configuration(
                "encryption key is not configured".to_string(),
            ));
        }

        let anonymized = self
            .anonymizer
            .anonymize(&request.source_text, &request.identifiers);

        let batch_id = BatchId::new();
        let jobs: Vec<GenerationJob> = request
            .job_specs
            .iter()
            .map(|spec| GenerationJob::pending(batch_id, spec))
            .collect();

        let batch = GenerationBatch {
            id: batch_id,
            status: BatchStatus::Pending,
            map_ciphertext: anonymized.map.encrypt_with(self.codec.as_ref())?,
            source_ciphertext: self.codec.encrypt(&request.source_text)?,
            job_ids: jobs.iter().map(|j| j.id).collect(),
            created_at: Utc::now(),
            completed_at: None,
        };

        self.progress.create_batch(&batch, &jobs).await?;

        tracing::info!(
            batch_id = %batch_id,
            jobs = jobs.len(),
            placeholders = anonymized.map.len(),
            "Generation batch prepared"
        );

        Ok(PreparedBatch {
            batch_id,
            jobs: jobs.into_iter().zip(request.job_specs).collect(),
            anonymized_text: Arc::from(anonymized.text),
            map: Arc::new(anonymized.map),
        })
    }

    /// Dispatches every job of a prepared batch and waits for all of them
    ///
    /// Jobs are dispatched in list order. A dispatch waits for a free slot and
    /// for the dispatch interval since the previous dispatch, whichever comes
    /// later. After shutdown is signalled no further job is dispatched;
    /// undispatched jobs fail, in-flight jobs run to completion.
    pub async fn execute(&self, prepared: PreparedBatch) -> BatchResult {
        let started = Instant::now();
        let batch_id = prepared.batch_id;
        self.progress.batch_running(&batch_id).await;

        let context = Arc::new(JobContext {
            batch_id,
            generator: Arc::clone(&self.generator),
            codec: Arc::clone(&self.codec),
            progress: self.progress.clone(),
            settings: Arc::clone(&self.settings),
            anonymized_text: prepared.anonymized_text,
            map: prepared.map,
        });

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency));
        let mut shutdown = self.shutdown.clone();
        let mut last_dispatch: Option<Instant> = None;
        let mut slots: Vec<JobSlot> = Vec::with_capacity(prepared.jobs.len());

        for (job, spec) in prepared.jobs {
            if *shutdown.borrow() {
                slots.push(self.cancel(job).await);
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                slots.push(self.cancel(job).await);
                continue;
            };

            if let Some(last) = last_dispatch {
                let paced = tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut shutdown) => false,
                    _ = tokio::time::sleep_until(last + self.settings.dispatch_interval) => true,
                };
                if !paced {
                    drop(permit);
                    slots.push(self.cancel(job).await);
                    continue;
                }
            }
            last_dispatch = Some(Instant::now());

            let job_id = job.id;
            let section = job.section.clone();
            let context = Arc::clone(&context);
            let handle = tokio::spawn(async move {
                let _permit = permit;
                run_job(&context, job, spec).await
            });
            slots.push(JobSlot::Running {
                job_id,
                section,
                handle,
            });
        }

        let mut jobs = Vec::with_capacity(slots.len());
        for slot in slots {
            jobs.push(self.join(slot).await);
        }

        let final_status =
            BatchStatus::aggregate(jobs.iter().map(|j| j.status)).unwrap_or(BatchStatus::Failed);
        self.progress.batch_finished(&batch_id, final_status).await;

        let result = BatchResult {
            batch_id,
            final_status,
            jobs,
            duration: started.elapsed(),
        };
        let counts = result.counts();
        log_batch_complete!(
            &batch_id,
            final_status,
            counts.completed,
            counts.failed,
            result.duration
        );
        result
    }

    /// [`prepare`](Self::prepare) followed by [`execute`](Self::execute)
    ///
    /// # Errors
    ///
    /// Only preparation errors; job failures are recorded in the result.
    pub async fn run(&self, request: GenerationRequest) -> Result<BatchResult> {
        let prepared = self.prepare(request).await?;
        Ok(self.execute(prepared).await)
    }

    async fn cancel(&self, job: GenerationJob) -> JobSlot {
        self.progress
            .job_failed(&job.id, CANCELLED_BEFORE_DISPATCH, None, 0)
            .await;
        tracing::info!(job_id = %job.id, section = %job.section, "Job cancelled before dispatch");
        JobSlot::Done(JobResult::failed(
            job.id,
            &job.section,
            CANCELLED_BEFORE_DISPATCH,
            0,
        ))
    }

    async fn join(&self, slot: JobSlot) -> JobResult {
        match slot {
            JobSlot::Done(result) => result,
            JobSlot::Running {
                job_id,
                section,
                handle,
            } => match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let message = if e.is_panic() {
                        "job task panicked"
                    } else {
                        "job task was aborted"
                    };
                    tracing::error!(job_id = %job_id, section = %section, error = %e, "{message}");
                    self.progress.job_failed(&job_id, message, None, 0).await;
                    JobResult::failed(job_id, &section, message, 0)
                }
            },
        }
    }
}

enum JobSlot {
    Done(JobResult),
    Running {
        job_id: JobId,
        section: String,
        handle: JoinHandle<JobResult>,
    },
}

/// Resolves once shutdown is signalled; never resolves if the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_job(context: &JobContext, job: GenerationJob, spec: JobSpec) -> JobResult {
    let started = Instant::now();
    log_job_start!(&context.batch_id, &job.id, &job.section);
    context.progress.job_started(&job.id).await;

    let settings = &context.settings;
    let chain = settings.models.preferring(spec.model.as_deref());
    let request = CompletionRequest {
        system_prompt: spec.system_prompt,
        user_text: context.anonymized_text.to_string(),
        model_id: chain.primary().to_string(),
        temperature: spec.temperature.unwrap_or(settings.temperature),
        max_tokens: spec.max_tokens.unwrap_or(settings.max_tokens),
    };

    let outcome = call_with_retry(
        context.generator.as_ref(),
        &request,
        &chain,
        &settings.retry,
        settings.request_timeout,
        &job.id,
    )
    .await;
    let attempts = outcome.attempts;

    let result = match outcome.result {
        Ok((text, model)) => {
            let restored = deanonymize(&text, &context.map);
            match context.codec.encrypt(&restored) {
                Ok(ciphertext) => {
                    context
                        .progress
                        .job_completed(&job.id, &ciphertext, &model, attempts)
                        .await;
                    JobResult {
                        job_id: job.id,
                        section: job.section,
                        status: JobStatus::Completed,
                        error: None,
                        result_ciphertext: Some(ciphertext),
                        model: Some(model),
                        attempts,
                    }
                }
                Err(e) => {
                    let message = format!("Failed to encrypt result: {e}");
                    context
                        .progress
                        .job_failed(&job.id, &message, Some(&model), attempts)
                        .await;
                    JobResult::failed(job.id, &job.section, message, attempts)
                }
            }
        }
        Err(e) => {
            let message = e.to_string();
            context
                .progress
                .job_failed(&job.id, &message, None, attempts)
                .await;
            JobResult::failed(job.id, &job.section, message, attempts)
        }
    };

    log_job_complete!(&result.job_id, result.status, attempts, started.elapsed());
    result
}
