//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "phiscribe.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing PHIScribe configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        match fs::write(&self.output, sample_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Generate a key: phiscribe keygen");
                println!("  2. Create a .env file with your credentials:");
                println!("     - PHISCRIBE_API_KEY=<generation service key>");
                println!("     - PHISCRIBE_ENCRYPTION_KEY=<output of keygen>");
                println!("  3. Validate configuration: phiscribe validate-config");
                println!("  4. Generate: phiscribe generate --transcript session.txt \\");
                println!("       --identifiers patient.json --sections sections.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }
}

/// Sample configuration with every section and its defaults
pub(crate) fn sample_config() -> &'static str {
    r#"# PHIScribe Configuration File

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

[generation]
# OpenAI-compatible endpoint
base_url = "https://api.openai.com/v1"
api_key = "${PHISCRIBE_API_KEY}"

# Tried in order; an unavailable model falls through to the next one
models = ["gpt-4o", "gpt-4o-mini"]
temperature = 0.3
max_tokens = 2048
request_timeout_seconds = 120

# At most this many calls in flight
max_concurrency = 3
# Minimum delay between two dispatches
dispatch_interval_ms = 500

[generation.retry]
max_retries = 3
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

[encryption]
# 32-byte AES-256 key, base64 or hex (phiscribe keygen)
key = "${PHISCRIBE_ENCRYPTION_KEY}"

[anonymization]
enabled_patterns = ["email", "phone", "date", "age", "relative", "employer", "professional", "city"]
min_name_token_len = 3

[rate_limit]
enabled = true
max_requests = 10
window_seconds = 60

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
}
