//! Configuration management for PHIScribe.
//!
//! # Overview
//!
//! PHIScribe uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `PHISCRIBE_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation before any request is accepted
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use phiscribe::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("phiscribe.toml")?;
//! println!("Models: {:?}", config.generation.models);
//! println!("Concurrency: {}", config.generation.max_concurrency);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`GenerationConfig`] - Text generation service, concurrency, pacing and [`RetryConfig`]
//! - [`EncryptionConfig`] - Field encryption key
//! - [`AnonymizationConfig`](crate::anonymization::AnonymizationConfig) - Pattern classes
//! - [`RateLimitConfig`] - Per-requester submission limits
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [generation]
//! base_url = "https://api.openai.com/v1"
//! api_key = "${PHISCRIBE_API_KEY}"
//! models = ["gpt-4o", "gpt-4o-mini"]
//! max_concurrency = 3
//! dispatch_interval_ms = 500
//!
//! [generation.retry]
//! max_retries = 3
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//!
//! [encryption]
//! key = "${PHISCRIBE_ENCRYPTION_KEY}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_str};
pub use schema::{
    ApplicationConfig, EncryptionConfig, GenerationConfig, LoggingConfig, RateLimitConfig,
    RetryConfig, ScribeConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
