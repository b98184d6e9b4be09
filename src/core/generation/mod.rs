//! Generation orchestration
//!
//! - [`orchestrator`] - batch preparation, bounded dispatch, aggregation
//! - [`retry`] - capped exponential backoff and model fallback
//! - [`progress`] - incremental persistence of job and batch transitions
//! - [`summary`] - batch and job results
//! - [`supervisor`] - supervised background execution with rate limiting

pub mod orchestrator;
pub mod progress;
pub mod retry;
pub mod summary;
pub mod supervisor;

pub use orchestrator::{
    GenerationOrchestrator, OrchestratorSettings, PreparedBatch, CANCELLED_BEFORE_DISPATCH,
};
pub use progress::{BatchSnapshot, ProgressRecorder};
pub use retry::{call_with_retry, CallOutcome, ModelChain, RetryPolicy};
pub use summary::{BatchResult, JobCounts, JobResult};
pub use supervisor::{BatchHandle, GenerationSupervisor};
