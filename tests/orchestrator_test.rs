//! Integration tests for batch orchestration
//!
//! Most tests run on paused time so backoff, pacing and slow calls advance
//! instantly and every recorded `Instant` is deterministic.

use async_trait::async_trait;
use phiscribe::adapters::store::MemoryStore;
use phiscribe::adapters::textgen::{CompletionRequest, TextGenerator};
use phiscribe::anonymization::Anonymizer;
use phiscribe::core::generation::{
    GenerationOrchestrator, ModelChain, OrchestratorSettings, RetryPolicy,
    CANCELLED_BEFORE_DISPATCH,
};
use phiscribe::crypto::{BlobCodec, EncryptionKey, FieldCipher};
use phiscribe::domain::{
    BatchStatus, GenerationError, GenerationRequest, JobSpec, JobStatus, PatientIdentifiers,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;

type Behaviour = Box<dyn Fn(&CompletionRequest) -> Result<String, GenerationError> + Send + Sync>;

#[derive(Debug, Clone)]
struct Call {
    at: Instant,
    model: String,
    prompt: String,
    user_text: String,
    temperature: f32,
    max_tokens: u32,
}

/// Programmable generator that tracks concurrency and records every call
struct FakeGenerator {
    behaviour: Behaviour,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<Call>>,
}

impl FakeGenerator {
    fn new(latency: Duration, behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn echo(latency: Duration) -> Self {
        Self::new(
            latency,
            Box::new(|r: &CompletionRequest| Ok(format!("Summary: {}", r.user_text))),
        )
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn calls_for(&self, prompt: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.prompt == prompt)
            .collect()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
        self.calls.lock().unwrap().push(Call {
            at: Instant::now(),
            model: request.model_id.clone(),
            prompt: request.system_prompt.clone(),
            user_text: request.user_text.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        });
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.latency).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.behaviour)(request)
    }
}

fn settings(max_concurrency: usize, dispatch_interval: Duration) -> OrchestratorSettings {
    OrchestratorSettings {
        max_concurrency,
        dispatch_interval,
        request_timeout: Duration::from_secs(30),
        retry: RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            multiplier: 2.0,
        },
        models: ModelChain::new(["primary-model", "fallback-model"]).unwrap(),
        temperature: 0.3,
        max_tokens: 512,
    }
}

struct Harness {
    orchestrator: Arc<GenerationOrchestrator>,
    codec: Arc<FieldCipher>,
    shutdown: watch::Sender<bool>,
}

fn harness(generator: Arc<dyn TextGenerator>, settings: OrchestratorSettings) -> Harness {
    let codec = Arc::new(FieldCipher::new(&EncryptionKey::generate()));
    let (shutdown, rx) = watch::channel(false);
    let orchestrator = GenerationOrchestrator::new(
        generator,
        Arc::clone(&codec) as Arc<dyn BlobCodec>,
        Anonymizer::with_defaults().unwrap(),
        Arc::new(MemoryStore::new()),
        settings,
        rx,
    );
    Harness {
        orchestrator: Arc::new(orchestrator),
        codec,
        shutdown,
    }
}

fn request(prompts: &[&str]) -> GenerationRequest {
    GenerationRequest::new(
        "Jane Roe (jane.roe@example.com) reports two weeks of poor sleep.",
        PatientIdentifiers::with_name("Jane Roe").email("jane.roe@example.com"),
        prompts
            .iter()
            .enumerate()
            .map(|(i, p)| JobSpec::new(format!("section-{i}"), *p))
            .collect(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_never_exceeds_cap() {
    let generator = Arc::new(FakeGenerator::echo(Duration::from_secs(1)));
    let h = harness(generator.clone(), settings(3, Duration::from_millis(100)));

    let result = h.orchestrator.run(request(&["p"; 10])).await.unwrap();

    assert_eq!(result.final_status, BatchStatus::Completed);
    assert_eq!(result.counts().completed, 10);
    assert_eq!(generator.calls().len(), 10);
    assert_eq!(generator.max_in_flight.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_interval_is_respected() {
    let generator = Arc::new(FakeGenerator::echo(Duration::from_millis(10)));
    let h = harness(generator.clone(), settings(10, Duration::from_millis(250)));

    h.orchestrator.run(request(&["p"; 5])).await.unwrap();

    let calls = generator.calls();
    assert_eq!(calls.len(), 5);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_millis(250));
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_slot_delays_dispatch_beyond_interval() {
    let generator = Arc::new(FakeGenerator::echo(Duration::from_secs(2)));
    let h = harness(generator.clone(), settings(1, Duration::from_millis(100)));

    h.orchestrator.run(request(&["p"; 3])).await.unwrap();

    let calls = generator.calls();
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= Duration::from_secs(2));
    }
}

#[tokio::test(start_paused = true)]
async fn test_partial_failure_completes_batch() {
    let generator = Arc::new(FakeGenerator::new(
        Duration::from_millis(50),
        Box::new(|r: &CompletionRequest| match r.system_prompt.as_str() {
            "ok" => Ok("fine".to_string()),
            "bad" => Err(GenerationError::Failed("content rejected".to_string())),
            _ => Err(GenerationError::ServerError {
                status: 503,
                message: "overloaded".to_string(),
            }),
        }),
    ));
    let h = harness(generator.clone(), settings(4, Duration::from_millis(10)));

    let prompts = ["ok", "bad", "ok", "flaky", "ok", "bad", "flaky", "ok", "flaky", "ok"];
    let result = h.orchestrator.run(request(&prompts)).await.unwrap();

    assert_eq!(result.final_status, BatchStatus::Completed);
    let counts = result.counts();
    assert_eq!((counts.completed, counts.failed), (5, 5));
    assert!(result.is_partial());

    for job in &result.jobs {
        match job.status {
            JobStatus::Completed => {
                assert!(job.result_ciphertext.is_some());
                assert_eq!(job.attempts, 1);
            }
            JobStatus::Failed => {
                assert!(job.result_ciphertext.is_none());
                assert!(job.error.is_some());
            }
            other => panic!("non-terminal job in result: {other}"),
        }
    }

    // Non-retryable errors are attempted once, retryable ones M + 1 times
    assert_eq!(generator.calls_for("bad").len(), 2);
    assert_eq!(generator.calls_for("flaky").len(), 3 * 4);
}

#[tokio::test(start_paused = true)]
async fn test_all_jobs_failed() {
    let generator = Arc::new(FakeGenerator::new(
        Duration::ZERO,
        Box::new(|_: &CompletionRequest| Err(GenerationError::Failed("nope".to_string()))),
    ));
    let h = harness(generator, settings(2, Duration::ZERO));

    let result = h.orchestrator.run(request(&["a", "b", "c"])).await.unwrap();

    assert_eq!(result.final_status, BatchStatus::Failed);
    assert_eq!(result.counts().failed, 3);

    let snapshot = h.orchestrator.progress().snapshot(&result.batch_id).await.unwrap();
    assert_eq!(snapshot.status(), BatchStatus::Failed);
    assert_eq!(snapshot.count(JobStatus::Failed), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_follows_capped_backoff() {
    let generator = Arc::new(FakeGenerator::new(
        Duration::ZERO,
        Box::new(|_: &CompletionRequest| {
            Err(GenerationError::ServerError {
                status: 502,
                message: "bad gateway".to_string(),
            })
        }),
    ));
    let h = harness(generator.clone(), settings(1, Duration::ZERO));

    let result = h.orchestrator.run(request(&["p"])).await.unwrap();

    let job = &result.jobs[0];
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 4);
    assert!(job.error.as_deref().unwrap_or_default().contains("502"));

    let calls = generator.calls();
    assert_eq!(calls.len(), 4);
    let expected = [1, 2, 3].map(Duration::from_secs);
    for (pair, want) in calls.windows(2).zip(expected) {
        let gap = pair[1].at - pair[0].at;
        assert!(gap >= want && gap < want + Duration::from_millis(5), "gap {gap:?}, want {want:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_failure_then_success() {
    let failures = Arc::new(AtomicUsize::new(2));
    let remaining = Arc::clone(&failures);
    let generator = Arc::new(FakeGenerator::new(
        Duration::ZERO,
        Box::new(move |_: &CompletionRequest| {
            if remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                Err(GenerationError::RateLimited { retry_after: None })
            } else {
                Ok("recovered".to_string())
            }
        }),
    ));
    let h = harness(generator, settings(1, Duration::ZERO));

    let result = h.orchestrator.run(request(&["p"])).await.unwrap();

    let job = &result.jobs[0];
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 3);
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    let text = h.codec.decrypt(job.result_ciphertext.as_deref().unwrap()).unwrap();
    assert_eq!(text, "recovered");
}

#[tokio::test(start_paused = true)]
async fn test_model_fallback_and_preferred_model() {
    let generator = Arc::new(FakeGenerator::new(
        Duration::ZERO,
        Box::new(|r: &CompletionRequest| {
            if r.model_id == "primary-model" || r.model_id == "retired-model" {
                Err(GenerationError::ModelUnavailable(r.model_id.clone()))
            } else {
                Ok(format!("written by {}", r.model_id))
            }
        }),
    ));
    let h = harness(generator.clone(), settings(1, Duration::ZERO));

    let mut req = request(&["default", "preferred"]);
    req.job_specs[1] = req.job_specs[1].clone().with_model("retired-model");
    let result = h.orchestrator.run(req).await.unwrap();

    for job in &result.jobs {
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.model.as_deref(), Some("fallback-model"));
    }
    assert_eq!(result.jobs[0].attempts, 2);
    assert_eq!(result.jobs[1].attempts, 3);

    let preferred: Vec<String> = generator
        .calls_for("preferred")
        .into_iter()
        .map(|c| c.model)
        .collect();
    assert_eq!(
        preferred,
        vec!["retired-model", "primary-model", "fallback-model"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_section_overrides_reach_the_service() {
    let generator = Arc::new(FakeGenerator::echo(Duration::ZERO));
    let h = harness(generator.clone(), settings(1, Duration::ZERO));

    let mut req = request(&["defaults", "tuned"]);
    req.job_specs[1] = req.job_specs[1]
        .clone()
        .with_temperature(0.9)
        .with_max_tokens(64);
    h.orchestrator.run(req).await.unwrap();

    let defaults = generator.calls_for("defaults");
    assert_eq!((defaults[0].temperature, defaults[0].max_tokens), (0.3, 512));
    let tuned = generator.calls_for("tuned");
    assert_eq!((tuned[0].temperature, tuned[0].max_tokens), (0.9, 64));
}

#[tokio::test(start_paused = true)]
async fn test_service_never_sees_identifiers() {
    let generator = Arc::new(FakeGenerator::echo(Duration::ZERO));
    let h = harness(generator.clone(), settings(2, Duration::ZERO));

    let result = h.orchestrator.run(request(&["a", "b"])).await.unwrap();

    for call in generator.calls() {
        assert!(!call.user_text.contains("Jane Roe"));
        assert!(!call.user_text.contains("jane.roe@example.com"));
        assert!(call.user_text.contains("[PATIENT_NAME]"));
    }
    for job in &result.jobs {
        let text = h.codec.decrypt(job.result_ciphertext.as_deref().unwrap()).unwrap();
        assert!(text.contains("Jane Roe"));
        assert!(text.contains("jane.roe@example.com"));
        assert!(!text.contains("[PATIENT_NAME]"));
    }
}

/// Blocks every call until released, announcing each start
struct Gated {
    started: Notify,
    release: Notify,
}

#[async_trait]
impl TextGenerator for Gated {
    async fn generate(&self, _request: &CompletionRequest) -> Result<String, GenerationError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok("done".to_string())
    }
}

#[tokio::test]
async fn test_progress_is_visible_while_jobs_run() {
    let generator = Arc::new(Gated {
        started: Notify::new(),
        release: Notify::new(),
    });
    let h = harness(generator.clone(), settings(1, Duration::ZERO));

    let prepared = h.orchestrator.prepare(request(&["a", "b"])).await.unwrap();
    let batch_id = prepared.batch_id();

    let snapshot = h.orchestrator.progress().snapshot(&batch_id).await.unwrap();
    assert_eq!(snapshot.status(), BatchStatus::Pending);
    assert_eq!(snapshot.count(JobStatus::Pending), 2);

    let orchestrator = Arc::clone(&h.orchestrator);
    let run = tokio::spawn(async move { orchestrator.execute(prepared).await });

    generator.started.notified().await;
    let snapshot = h.orchestrator.progress().snapshot(&batch_id).await.unwrap();
    assert_eq!(snapshot.status(), BatchStatus::Running);
    assert_eq!(snapshot.count(JobStatus::Generating), 1);
    assert_eq!(snapshot.count(JobStatus::Pending), 1);

    generator.release.notify_one();
    generator.started.notified().await;
    let snapshot = h.orchestrator.progress().snapshot(&batch_id).await.unwrap();
    assert_eq!(snapshot.count(JobStatus::Completed), 1);
    assert_eq!(snapshot.count(JobStatus::Generating), 1);

    generator.release.notify_one();
    let result = run.await.unwrap();
    assert_eq!(result.final_status, BatchStatus::Completed);

    let snapshot = h.orchestrator.progress().snapshot(&batch_id).await.unwrap();
    assert_eq!(snapshot.status(), BatchStatus::Completed);
    assert!(snapshot.batch.completed_at.is_some());
    assert!(snapshot
        .jobs
        .iter()
        .all(|j| j.status == JobStatus::Completed && j.result_ciphertext.is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_mid_batch_finishes_in_flight_jobs() {
    let generator = Arc::new(FakeGenerator::echo(Duration::from_secs(1)));
    let h = harness(generator.clone(), settings(1, Duration::ZERO));

    let orchestrator = Arc::clone(&h.orchestrator);
    let run = tokio::spawn(async move { orchestrator.run(request(&["a", "b", "c", "d"])).await });

    tokio::time::sleep(Duration::from_millis(500)).await;
    h.shutdown.send(true).unwrap();

    let result = run.await.unwrap().unwrap();

    assert_eq!(generator.calls().len(), 1);
    assert_eq!(result.final_status, BatchStatus::Completed);
    assert_eq!(result.jobs[0].status, JobStatus::Completed);
    for job in &result.jobs[1..] {
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some(CANCELLED_BEFORE_DISPATCH));
        assert_eq!(job.attempts, 0);
    }

    let snapshot = h.orchestrator.progress().snapshot(&result.batch_id).await.unwrap();
    assert_eq!(snapshot.count(JobStatus::Failed), 3);
    assert_eq!(snapshot.count(JobStatus::Completed), 1);
}

/// Panics on the first call only
struct PanicsOnce {
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for PanicsOnce {
    async fn generate(&self, _request: &CompletionRequest) -> Result<String, GenerationError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("generator bug");
        }
        Ok("fine".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_job_is_recorded_as_failed() {
    let generator = Arc::new(PanicsOnce {
        calls: AtomicUsize::new(0),
    });
    let h = harness(generator, settings(1, Duration::ZERO));

    let result = h.orchestrator.run(request(&["a", "b"])).await.unwrap();

    assert_eq!(result.jobs[0].status, JobStatus::Failed);
    assert_eq!(result.jobs[0].error.as_deref(), Some("job task panicked"));
    assert_eq!(result.jobs[1].status, JobStatus::Completed);
    assert_eq!(result.final_status, BatchStatus::Completed);
}
