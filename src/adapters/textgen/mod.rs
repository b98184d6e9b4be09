//! Text generation service adapter
//!
//! The orchestrator only depends on [`TextGenerator`]. Implementations must
//! map failures onto [`GenerationError`] variants precisely, since retry
//! classification and model fallback are driven by them.

pub mod client;
pub mod models;

pub use client::HttpTextGenerator;
pub use models::CompletionRequest;

use crate::domain::errors::GenerationError;
use async_trait::async_trait;

/// Single call: prompt in, generated text out
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates text for an anonymized request
    ///
    /// # Errors
    ///
    /// - [`GenerationError::RateLimited`] on an explicit rate-limit signal
    /// - [`GenerationError::ServerError`] on 5xx responses
    /// - [`GenerationError::ModelUnavailable`] when the model id is unknown
    /// - [`GenerationError::Network`] / [`GenerationError::Timeout`] on transport failures
    /// - other variants for non-retryable failures
    async fn generate(&self, request: &CompletionRequest) -> Result<String, GenerationError>;
}
