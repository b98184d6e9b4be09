//! Domain models and types for PHIScribe.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`BatchId`], [`JobId`])
//! - **Patient identifiers** ([`PatientIdentifiers`]) supplied with a source text
//! - **Job and batch models** ([`GenerationJob`], [`GenerationBatch`], [`JobSpec`])
//! - **Error types** ([`ScribeError`], [`CryptoError`], [`GenerationError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Lifecycles
//!
//! Jobs move `pending -> generating -> {completed, failed}` and batches move
//! `pending -> running -> {completed, failed}`. Both are monotonic. A batch is
//! `failed` only when every one of its jobs failed:
//!
//! ```rust
//! use phiscribe::domain::{BatchStatus, JobStatus};
//!
//! let status = BatchStatus::aggregate([JobStatus::Failed, JobStatus::Completed]);
//! assert_eq!(status, Some(BatchStatus::Completed));
//! ```

pub mod errors;
pub mod identifiers;
pub mod ids;
pub mod job;
pub mod result;

// Re-export commonly used types for convenience
pub use errors::{CryptoError, GenerationError, ScribeError, StoreError};
pub use identifiers::PatientIdentifiers;
pub use ids::{BatchId, JobId};
pub use job::{
    BatchStatus, GenerationBatch, GenerationJob, GenerationRequest, JobSpec, JobStatus,
};
pub use result::Result;
