//! Logging and observability
//!
//! Structured `tracing` events with `batch_id`, `job_id`, `section`,
//! `attempt`, `delay_ms` and `model` fields. Source text, identifiers, map
//! values and generated text are never logged.
//!
//! Heuristic legacy decryptions are reported on the `phiscribe::audit` target.
//!
//! # Example
//!
//! ```no_run
//! use phiscribe::logging::init_logging;
//! use phiscribe::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the dispatch of a generation job
///
/// # Example
///
/// ```no_run
/// use phiscribe::log_job_start;
/// use phiscribe::domain::{BatchId, JobId};
///
/// let batch_id = BatchId::new();
/// let job_id = JobId::new();
/// log_job_start!(&batch_id, &job_id, "assessment");
/// ```
#[macro_export]
macro_rules! log_job_start {
    ($batch_id:expr, $job_id:expr, $section:expr) => {
        tracing::info!(
            batch_id = %$batch_id,
            job_id = %$job_id,
            section = %$section,
            "Dispatching generation job"
        );
    };
}

/// Log the terminal transition of a generation job
///
/// # Example
///
/// ```no_run
/// use phiscribe::log_job_complete;
/// use phiscribe::domain::{JobId, JobStatus};
/// use std::time::Duration;
///
/// let job_id = JobId::new();
/// log_job_complete!(&job_id, JobStatus::Completed, 2, Duration::from_millis(830));
/// ```
#[macro_export]
macro_rules! log_job_complete {
    ($job_id:expr, $status:expr, $attempts:expr, $duration:expr) => {
        tracing::info!(
            job_id = %$job_id,
            status = %$status,
            attempts = $attempts,
            duration_ms = $duration.as_millis() as u64,
            "Generation job finished"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use phiscribe::log_retry_attempt;
/// use phiscribe::domain::JobId;
/// use std::time::Duration;
///
/// let job_id = JobId::new();
/// let error = "Rate limited";
/// log_retry_attempt!(&job_id, 1, Duration::from_secs(2), "gpt-4o", error);
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($job_id:expr, $attempt:expr, $delay:expr, $model:expr, $error:expr) => {
        tracing::warn!(
            job_id = %$job_id,
            attempt = $attempt,
            delay_ms = $delay.as_millis() as u64,
            model = %$model,
            error = %$error,
            "Retryable generation failure, backing off"
        );
    };
}

/// Log the terminal transition of a batch
///
/// # Example
///
/// ```no_run
/// use phiscribe::log_batch_complete;
/// use phiscribe::domain::{BatchId, BatchStatus};
/// use std::time::Duration;
///
/// let batch_id = BatchId::new();
/// log_batch_complete!(&batch_id, BatchStatus::Completed, 3, 1, Duration::from_secs(12));
/// ```
#[macro_export]
macro_rules! log_batch_complete {
    ($batch_id:expr, $status:expr, $completed:expr, $failed:expr, $duration:expr) => {
        tracing::info!(
            batch_id = %$batch_id,
            status = %$status,
            completed = $completed,
            failed = $failed,
            duration_ms = $duration.as_millis() as u64,
            "Generation batch finished"
        );
    };
}
