//! Configuration schema types
//!
//! This module defines the configuration structure for PHIScribe.

use crate::anonymization::AnonymizationConfig;
use crate::config::SecretString;
use crate::crypto::EncryptionKey;
use crate::domain::errors::CryptoError;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main PHIScribe configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScribeConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Text generation service and orchestration settings
    pub generation: GenerationConfig,

    /// Field encryption
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Anonymization passes
    #[serde(default)]
    pub anonymization: AnonymizationConfig,

    /// Per-requester submission limits
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ScribeConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.generation.validate()?;
        self.encryption.validate()?;
        self.anonymization.validate()?;
        self.rate_limit.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

/// Retry configuration for calls to the text generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt for retryable failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.initial_delay_ms == 0 {
            return Err("generation.retry.initial_delay_ms must be > 0".to_string());
        }
        if self.max_delay_ms < self.initial_delay_ms {
            return Err(
                "generation.retry.max_delay_ms must be >= generation.retry.initial_delay_ms"
                    .to_string(),
            );
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err("generation.retry.backoff_multiplier must be >= 1.0".to_string());
        }
        Ok(())
    }
}

/// Text generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of an OpenAI-compatible API (e.g. `https://api.openai.com/v1`)
    pub base_url: String,

    /// Bearer token for the service
    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Model identifiers, tried in order when a model is unavailable
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Output token limit per section
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Overall timeout of one call, in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Calls in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Minimum delay between successive job dispatches, in milliseconds
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,

    /// Retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl GenerationConfig {
    fn validate(&self) -> Result<(), String> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| format!("generation.base_url '{}' is not a valid URL: {e}", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err("generation.base_url must start with http:// or https://".to_string());
        }

        if self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().is_blank())
            .unwrap_or(true)
        {
            return Err("generation.api_key cannot be empty".to_string());
        }

        if self.models.is_empty() || self.models.iter().any(|m| m.trim().is_empty()) {
            return Err("generation.models must list at least one non-empty model".to_string());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err("generation.temperature must be between 0.0 and 2.0".to_string());
        }
        if self.max_tokens == 0 {
            return Err("generation.max_tokens must be > 0".to_string());
        }
        if self.request_timeout_seconds == 0 {
            return Err("generation.request_timeout_seconds must be > 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("generation.max_concurrency must be > 0".to_string());
        }

        self.retry.validate()
    }

    /// Overall timeout of one call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Minimum delay between dispatches
    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            models: default_models(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_concurrency: default_max_concurrency(),
            dispatch_interval_ms: default_dispatch_interval_ms(),
            retry: RetryConfig::default(),
        }
    }
}

/// Field encryption configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncryptionConfig {
    /// Base64 (or hex) encoded 32-byte AES key
    #[serde(default)]
    pub key: Option<SecretString>,
}

impl EncryptionConfig {
    fn validate(&self) -> Result<(), String> {
        self.encryption_key()
            .map(|_| ())
            .map_err(|e| format!("encryption.key: {e}"))
    }

    /// Parses the configured key
    pub fn encryption_key(&self) -> Result<EncryptionKey, CryptoError> {
        match &self.key {
            Some(key) => EncryptionKey::from_encoded(key.expose_secret().as_ref()),
            None => Err(CryptoError::NotConfigured),
        }
    }
}

/// Per-requester submission limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable the limiter
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Submissions allowed per window
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds
    #[serde(default = "default_rate_limit_window_seconds")]
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_rate_limit_max_requests(),
            window_seconds: default_rate_limit_window_seconds(),
        }
    }
}

impl RateLimitConfig {
    fn validate(&self) -> Result<(), String> {
        if self.enabled && self.max_requests == 0 {
            return Err("rate_limit.max_requests must be > 0".to_string());
        }
        if self.enabled && self.window_seconds == 0 {
            return Err("rate_limit.window_seconds must be > 0".to_string());
        }
        Ok(())
    }

    /// Window length
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local JSON file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy (daily, hourly, never)
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_models() -> Vec<String> {
    vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()]
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_request_timeout_seconds() -> u64 {
    120
}

fn default_max_concurrency() -> usize {
    3
}

fn default_dispatch_interval_ms() -> u64 {
    500
}

fn default_rate_limit_max_requests() -> u32 {
    10
}

fn default_rate_limit_window_seconds() -> u64 {
    60
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
