//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the PHIScribe configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates; secrets are never printed.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Generation Service: {}", config.generation.base_url);
        println!("  Models: {}", config.generation.models.join(" -> "));
        println!("  Max Concurrency: {}", config.generation.max_concurrency);
        println!(
            "  Dispatch Interval: {}ms",
            config.generation.dispatch_interval_ms
        );
        println!(
            "  Retries: {} (backoff {}ms..{}ms)",
            config.generation.retry.max_retries,
            config.generation.retry.initial_delay_ms,
            config.generation.retry.max_delay_ms
        );
        println!("  Encryption Key: configured");
        println!(
            "  Pattern Classes: {}",
            config.anonymization.enabled_patterns.join(", ")
        );
        if config.rate_limit.enabled {
            println!(
                "  Rate Limit: {} per {}s",
                config.rate_limit.max_requests, config.rate_limit.window_seconds
            );
        } else {
            println!("  Rate Limit: disabled");
        }
        println!();
        Ok(0)
    }
}
