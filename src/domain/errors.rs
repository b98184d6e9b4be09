//! Domain error types
//!
//! This module defines the error hierarchy for PHIScribe. Errors are
//! domain-specific and don't expose third-party types: HTTP, AEAD and store
//! failures are converted to strings at the adapter boundary.

use std::time::Duration;
use thiserror::Error;

/// Main PHIScribe error type
///
/// This is the primary error type used throughout the library. Per-job
/// generation failures are *recorded* on the job rather than surfaced through
/// this type, so one failing section never aborts its siblings.
#[derive(Debug, Error)]
pub enum ScribeError {
    /// Missing or invalid configuration (keys, credentials, endpoints)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Encryption codec errors
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Text generation service errors
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Requester exceeded the submission rate limit
    #[error("Rate limit exceeded for requester: {0}")]
    RateLimited(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Work was cancelled before it could run
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Encryption codec errors
///
/// `MalformedInput` and `AuthenticationFailed` are kept apart on purpose:
/// the legacy field reader treats both as "probably plaintext", while callers
/// holding an explicit encrypted flag hard-fail on either.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// No key was configured for this codec
    #[error("Encryption key is not configured")]
    NotConfigured,

    /// Key material has the wrong length or encoding
    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    /// Input is not decodable or shorter than nonce + tag
    #[error("Malformed encrypted input: {0}")]
    MalformedInput(String),

    /// AEAD tag verification failed (tampered data or wrong key)
    #[error("Authentication failed: wrong key or tampered ciphertext")]
    AuthenticationFailed,

    /// The AEAD primitive refused to encrypt
    #[error("Encryption failed")]
    EncryptionFailed,
}

/// Text generation service errors
///
/// The orchestrator's retry classification depends on these variants, so
/// adapters must map transport and HTTP status failures onto them precisely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Explicit rate-limit signal from the service (HTTP 429)
    #[error("Rate limited by generation service")]
    RateLimited {
        /// Server-provided hint for when to retry
        retry_after: Option<Duration>,
    },

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// The requested model identifier is not available
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Transient network failure
    #[error("Network error: {0}")]
    Network(String),

    /// The call exceeded its overall timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// The service answered with something we could not use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Bad credentials or client configuration
    #[error("Generation client misconfigured: {0}")]
    Configuration(String),

    /// Any other failure
    #[error("Generation failed: {0}")]
    Failed(String),
}

impl GenerationError {
    /// Whether the failure is worth another attempt with the same model
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ServerError { .. }
                | Self::Network(_)
                | Self::Timeout(_)
        )
    }

    /// Server-provided retry hint, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Record store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this id
    #[error("Record not found: {entity}/{id}")]
    NotFound { entity: String, id: String },

    /// A record with this id already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for ScribeError {
    fn from(err: std::io::Error) -> Self {
        ScribeError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        ScribeError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ScribeError {
    fn from(err: toml::de::Error) -> Self {
        ScribeError::Configuration(format!("TOML parse error: {err}"))
    }
}
