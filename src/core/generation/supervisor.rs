//! Supervised background execution of generation batches
//!
//! `submit` prepares a batch synchronously (so validation and configuration
//! errors reach the caller) and returns a [`BatchHandle`] right away while
//! the batch runs on a task owned by the supervisor, not by the caller.

use super::orchestrator::GenerationOrchestrator;
use super::progress::BatchSnapshot;
use super::summary::BatchResult;
use crate::adapters::rate_limit::RateLimiter;
use crate::domain::errors::ScribeError;
use crate::domain::ids::BatchId;
use crate::domain::job::GenerationRequest;
use crate::domain::result::Result;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;

/// Rate-limiter key for requests that carry no requester
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// Handle to a submitted batch
#[derive(Debug)]
pub struct BatchHandle {
    batch_id: BatchId,
    result: oneshot::Receiver<BatchResult>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Waits for the batch to finish
    ///
    /// # Errors
    ///
    /// Returns [`ScribeError::Cancelled`] if the supervised task ended
    /// without producing a result.
    pub async fn wait(self) -> Result<BatchResult> {
        self.result.await.map_err(|_| {
            ScribeError::Cancelled(format!("batch {} ended without a result", self.batch_id))
        })
    }
}

/// Owns every running batch task
pub struct GenerationSupervisor {
    orchestrator: Arc<GenerationOrchestrator>,
    limiter: Arc<dyn RateLimiter>,
    shutdown_tx: watch::Sender<bool>,
    closed: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl GenerationSupervisor {
    /// `shutdown_tx` must be the sender paired with the orchestrator's
    /// shutdown receiver.
    pub fn new(
        orchestrator: Arc<GenerationOrchestrator>,
        limiter: Arc<dyn RateLimiter>,
        shutdown_tx: watch::Sender<bool>,
    ) -> Self {
        Self {
            orchestrator,
            limiter,
            shutdown_tx,
            closed: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Accepts a batch and starts it in the background
    ///
    /// # Errors
    ///
    /// - [`ScribeError::Cancelled`] after shutdown was requested
    /// - [`ScribeError::RateLimited`] when the requester is over its limit
    /// - any preparation error of [`GenerationOrchestrator::prepare`]
    pub async fn submit(&self, request: GenerationRequest) -> Result<BatchHandle> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ScribeError::Cancelled(
                "supervisor is shutting down".to_string(),
            ));
        }

        let requester = request
            .requester
            .clone()
            .unwrap_or_else(|| ANONYMOUS_REQUESTER.to_string());
        if !self.limiter.allow(&requester) {
            tracing::warn!(requester = %requester, "Generation request rejected by rate limiter");
            return Err(ScribeError::RateLimited(requester));
        }

        let prepared = self.orchestrator.prepare(request).await?;
        let batch_id = prepared.batch_id();

        // Checked again under the lock: shutdown may have run while preparing
        let mut tasks = self.tasks.lock().await;
        if self.closed.load(Ordering::SeqCst) {
            drop(tasks);
            // The shutdown signal is already set, so this only records the
            // jobs as cancelled
            let cancelled = self.orchestrator.execute(prepared).await;
            tracing::info!(
                batch_id = %batch_id,
                jobs = cancelled.jobs.len(),
                "Batch prepared during shutdown was cancelled"
            );
            return Err(ScribeError::Cancelled(format!(
                "batch {batch_id} was prepared after shutdown was requested"
            )));
        }

        let (tx, rx) = oneshot::channel();
        let orchestrator = Arc::clone(&self.orchestrator);
        let handle = tokio::spawn(async move {
            let result = orchestrator.execute(prepared).await;
            // The caller may have dropped its handle
            let _ = tx.send(result);
        });

        tasks.retain(|task| !task.is_finished());
        tasks.push(handle);
        drop(tasks);

        tracing::info!(batch_id = %batch_id, requester = %requester, "Generation batch submitted");
        Ok(BatchHandle {
            batch_id,
            result: rx,
        })
    }

    /// Current state of a batch as persisted
    ///
    /// # Errors
    ///
    /// Returns a store error if the batch is unknown.
    pub async fn status(&self, batch_id: &BatchId) -> Result<BatchSnapshot> {
        self.orchestrator.progress().snapshot(batch_id).await
    }

    /// Stops new submissions and dispatches without waiting
    pub fn request_shutdown(&self) {
        // Signal first: whoever observes `closed` also observes the signal.
        // Fails only when every receiver is gone, in which case nothing is running
        let _ = self.shutdown_tx.send(true);
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("Shutdown requested, no further jobs will be dispatched");
        }
    }

    /// Requests shutdown and waits for every supervised batch to finish
    ///
    /// The task list stays locked until every task is joined, so no
    /// submission can register new work in the meantime.
    pub async fn shutdown(&self) {
        self.request_shutdown();

        let mut tasks = self.tasks.lock().await;
        for joined in join_all(tasks.drain(..)).await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Supervised batch task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::rate_limit::{SlidingWindowLimiter, Unlimited};
    use crate::adapters::store::{EntityType, MemoryStore, Record, RecordStore};
    use crate::adapters::textgen::{CompletionRequest, TextGenerator};
    use crate::anonymization::Anonymizer;
    use crate::core::generation::orchestrator::OrchestratorSettings;
    use crate::core::generation::retry::{ModelChain, RetryPolicy};
    use crate::crypto::{EncryptionKey, FieldCipher};
    use crate::core::generation::orchestrator::CANCELLED_BEFORE_DISPATCH;
    use crate::domain::errors::{GenerationError, StoreError};
    use crate::domain::identifiers::PatientIdentifiers;
    use crate::domain::job::{BatchStatus, JobSpec};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct Fixed;

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok("generated".to_string())
        }
    }

    /// Holds the batch insert open until released
    struct GatedStore {
        inner: MemoryStore,
        entered: Notify,
        release: Notify,
        batch_id: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl RecordStore for GatedStore {
        async fn get(&self, entity: EntityType, id: &str) -> std::result::Result<Record, StoreError> {
            self.inner.get(entity, id).await
        }

        async fn update(
            &self,
            entity: EntityType,
            id: &str,
            fields: Record,
        ) -> std::result::Result<(), StoreError> {
            self.inner.update(entity, id, fields).await
        }

        async fn insert(&self, entity: EntityType, fields: Record) -> std::result::Result<Record, StoreError> {
            let record = self.inner.insert(entity, fields).await?;
            if entity == EntityType::Batch {
                *self.batch_id.lock().unwrap() =
                    record.get("id").and_then(|v| v.as_str()).map(str::to_string);
                self.entered.notify_one();
                self.release.notified().await;
            }
            Ok(record)
        }
    }

    fn supervisor(limiter: Arc<dyn RateLimiter>) -> GenerationSupervisor {
        supervisor_with_store(limiter, Arc::new(MemoryStore::new()))
    }

    fn supervisor_with_store(
        limiter: Arc<dyn RateLimiter>,
        store: Arc<dyn RecordStore>,
    ) -> GenerationSupervisor {
        let (tx, rx) = watch::channel(false);
        let orchestrator = GenerationOrchestrator::new(
            Arc::new(Fixed),
            Arc::new(FieldCipher::new(&EncryptionKey::generate())),
            Anonymizer::with_defaults().unwrap(),
            store,
            OrchestratorSettings {
                max_concurrency: 3,
                dispatch_interval: Duration::from_millis(10),
                request_timeout: Duration::from_secs(5),
                retry: RetryPolicy::default(),
                models: ModelChain::new(["m"]).unwrap(),
                temperature: 0.3,
                max_tokens: 64,
            },
            rx,
        );
        GenerationSupervisor::new(Arc::new(orchestrator), limiter, tx)
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(
            "transcript",
            PatientIdentifiers::default(),
            vec![JobSpec::new("a", "p"), JobSpec::new("b", "p")],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_before_completion() {
        let supervisor = supervisor(Arc::new(Unlimited));
        let handle = supervisor.submit(request()).await.unwrap();

        let snapshot = supervisor.status(&handle.batch_id()).await.unwrap();
        assert!(!snapshot.status().is_terminal());

        let result = handle.wait().await.unwrap();
        assert_eq!(result.final_status, BatchStatus::Completed);

        let snapshot = supervisor.status(&result.batch_id).await.unwrap();
        assert_eq!(snapshot.status(), BatchStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_submission() {
        let supervisor = supervisor(Arc::new(SlidingWindowLimiter::new(
            1,
            Duration::from_secs(60),
        )));
        supervisor
            .submit(request().for_requester("clinician-1"))
            .await
            .unwrap();

        let err = supervisor
            .submit(request().for_requester("clinician-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ScribeError::RateLimited(ref who) if who == "clinician-1"));

        assert!(supervisor
            .submit(request().for_requester("clinician-2"))
            .await
            .is_ok());
        supervisor.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_joins_tasks_and_rejects_new_work() {
        let supervisor = supervisor(Arc::new(Unlimited));
        let handle = supervisor.submit(request()).await.unwrap();

        supervisor.shutdown().await;

        // The batch reached a terminal state before shutdown returned
        let snapshot = supervisor.status(&handle.batch_id()).await.unwrap();
        assert!(snapshot.status().is_terminal());
        assert!(handle.wait().await.is_ok());

        assert!(matches!(
            supervisor.submit(request()).await,
            Err(ScribeError::Cancelled(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_during_prepare_cancels_the_batch() {
        let store = Arc::new(GatedStore {
            inner: MemoryStore::new(),
            entered: Notify::new(),
            release: Notify::new(),
            batch_id: std::sync::Mutex::new(None),
        });
        let supervisor = Arc::new(supervisor_with_store(
            Arc::new(Unlimited),
            Arc::clone(&store) as Arc<dyn RecordStore>,
        ));

        let submitting = {
            let supervisor = Arc::clone(&supervisor);
            tokio::spawn(async move { supervisor.submit(request()).await })
        };

        // Submission passed the closed check and is persisting the batch
        store.entered.notified().await;
        supervisor.shutdown().await;
        store.release.notify_one();

        let err = submitting.await.unwrap().unwrap_err();
        assert!(matches!(err, ScribeError::Cancelled(_)));
        assert!(supervisor.tasks.lock().await.is_empty());

        let batch_id: BatchId = store.batch_id.lock().unwrap().clone().unwrap().parse().unwrap();
        let snapshot = supervisor.status(&batch_id).await.unwrap();
        assert_eq!(snapshot.status(), BatchStatus::Failed);
        assert!(snapshot
            .jobs
            .iter()
            .all(|j| j.error_message.as_deref() == Some(CANCELLED_BEFORE_DISPATCH) && j.attempts == 0));
    }
}
