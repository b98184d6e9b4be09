//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::ScribeConfig;
use super::secret::secret_string;
use crate::domain::errors::ScribeError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into ScribeConfig
/// 4. Applies environment variable overrides (PHISCRIBE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`ScribeError::Configuration`] if the file cannot be read or parsed,
/// a referenced variable is missing, or validation fails. Configuration
/// problems surface here, before any request is accepted.
///
/// # Examples
///
/// ```no_run
/// use phiscribe::config::loader::load_config;
///
/// let config = load_config("phiscribe.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ScribeConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ScribeError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ScribeError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_str(&contents)
}

/// Loads configuration from TOML text (same steps as [`load_config`])
pub fn load_config_str(contents: &str) -> Result<ScribeConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ScribeConfig = toml::from_str(&contents)
        .map_err(|e| ScribeError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ScribeError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ScribeError::Other(format!("env substitution regex: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });
        result.push_str(&processed);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(ScribeError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ScribeError::Configuration(format!("Invalid value for {name}: '{value}'")))
}

/// Applies environment variable overrides using PHISCRIBE_* prefix
///
/// Environment variables follow the pattern: PHISCRIBE_<SECTION>_<KEY>
/// For example: PHISCRIBE_GENERATION_BASE_URL, PHISCRIBE_ENCRYPTION_KEY
fn apply_env_overrides(config: &mut ScribeConfig) -> Result<()> {
    let var = |name: &str| std::env::var(name).ok();

    // Application overrides
    if let Some(val) = var("PHISCRIBE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Generation overrides
    if let Some(val) = var("PHISCRIBE_GENERATION_BASE_URL") {
        config.generation.base_url = val;
    }
    if let Some(val) = var("PHISCRIBE_GENERATION_API_KEY") {
        config.generation.api_key = Some(secret_string(val));
    }
    if let Some(val) = var("PHISCRIBE_GENERATION_MODELS") {
        config.generation.models = val
            .split(',')
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
    }
    if let Some(val) = var("PHISCRIBE_GENERATION_MAX_CONCURRENCY") {
        config.generation.max_concurrency =
            parse_env("PHISCRIBE_GENERATION_MAX_CONCURRENCY", &val)?;
    }
    if let Some(val) = var("PHISCRIBE_GENERATION_DISPATCH_INTERVAL_MS") {
        config.generation.dispatch_interval_ms =
            parse_env("PHISCRIBE_GENERATION_DISPATCH_INTERVAL_MS", &val)?;
    }
    if let Some(val) = var("PHISCRIBE_GENERATION_REQUEST_TIMEOUT_SECONDS") {
        config.generation.request_timeout_seconds =
            parse_env("PHISCRIBE_GENERATION_REQUEST_TIMEOUT_SECONDS", &val)?;
    }
    if let Some(val) = var("PHISCRIBE_GENERATION_RETRY_MAX_RETRIES") {
        config.generation.retry.max_retries =
            parse_env("PHISCRIBE_GENERATION_RETRY_MAX_RETRIES", &val)?;
    }

    // Encryption overrides
    if let Some(val) = var("PHISCRIBE_ENCRYPTION_KEY") {
        config.encryption.key = Some(secret_string(val));
    }

    // Anonymization overrides
    if let Some(val) = var("PHISCRIBE_ANONYMIZATION_ENABLED_PATTERNS") {
        config.anonymization.enabled_patterns = val
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
    }
    if let Some(val) = var("PHISCRIBE_ANONYMIZATION_MIN_NAME_TOKEN_LEN") {
        config.anonymization.min_name_token_len =
            parse_env("PHISCRIBE_ANONYMIZATION_MIN_NAME_TOKEN_LEN", &val)?;
    }

    // Rate limit overrides
    if let Some(val) = var("PHISCRIBE_RATE_LIMIT_ENABLED") {
        config.rate_limit.enabled = parse_env("PHISCRIBE_RATE_LIMIT_ENABLED", &val)?;
    }
    if let Some(val) = var("PHISCRIBE_RATE_LIMIT_MAX_REQUESTS") {
        config.rate_limit.max_requests = parse_env("PHISCRIBE_RATE_LIMIT_MAX_REQUESTS", &val)?;
    }

    // Logging overrides
    if let Some(val) = var("PHISCRIBE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = parse_env("PHISCRIBE_LOGGING_LOCAL_ENABLED", &val)?;
    }
    if let Some(val) = var("PHISCRIBE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
