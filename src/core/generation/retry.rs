//! Retry policy and model fallback for generation calls
//!
//! Retryable failures (rate limit, 5xx, network, timeout) are retried with
//! capped exponential backoff. An unavailable model advances the
//! [`ModelChain`] without spending retry budget. Everything else is terminal
//! on the first occurrence.

use crate::adapters::textgen::{CompletionRequest, TextGenerator};
use crate::config::RetryConfig;
use crate::domain::errors::{GenerationError, ScribeError};
use crate::domain::ids::JobId;
use crate::domain::result::Result;
use crate::log_retry_attempt;
use std::time::Duration;

/// Capped exponential backoff
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt (a job makes at most `max_retries + 1` calls)
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Delay before retry number `retry_index` (0-based):
    /// `min(initial * multiplier^retry_index, max)`
    pub fn delay_for(&self, retry_index: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry_index.min(i32::MAX as u32) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let max_millis = self.max_delay.as_millis() as f64;
        if !millis.is_finite() || millis >= max_millis {
            self.max_delay
        } else {
            Duration::from_millis(millis as u64)
        }
    }

    /// Delay before retrying after `error`
    ///
    /// A server `Retry-After` hint longer than the schedule wins, still
    /// capped at `max_delay`.
    pub fn delay_after(&self, retry_index: u32, error: &GenerationError) -> Duration {
        let scheduled = self.delay_for(retry_index);
        match error.retry_after() {
            Some(hint) if hint > scheduled => hint.min(self.max_delay),
            _ => scheduled,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.backoff_multiplier,
        }
    }
}

/// Ordered, non-empty list of acceptable model identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChain {
    models: Vec<String>,
}

impl ModelChain {
    /// # Errors
    ///
    /// Returns a configuration error if no non-blank model is given.
    pub fn new<I, S>(models: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut chain: Vec<String> = Vec::new();
        for model in models {
            let model = model.into().trim().to_string();
            if !model.is_empty() && !chain.contains(&model) {
                chain.push(model);
            }
        }
        if chain.is_empty() {
            return Err(ScribeError::Configuration(
                "at least one generation model must be configured".to_string(),
            ));
        }
        Ok(Self { models: chain })
    }

    /// Chain for one job: the job's preferred model first, then the rest
    pub fn preferring(&self, preferred: Option<&str>) -> Self {
        match preferred.map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => {
                let mut models = vec![model.to_string()];
                models.extend(self.models.iter().filter(|m| *m != model).cloned());
                Self { models }
            }
            None => self.clone(),
        }
    }

    pub fn primary(&self) -> &str {
        &self.models[0]
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Result of driving one job's calls to a terminal outcome
#[derive(Debug)]
pub struct CallOutcome {
    /// Generated text and the model that produced it
    pub result: std::result::Result<(String, String), GenerationError>,
    /// Calls made, including ones answered with "model unavailable"
    pub attempts: u32,
}

/// Calls the generator until success, a terminal error, or an exhausted
/// retry budget or model chain
///
/// Each call is bounded by `timeout`; an elapsed timeout is retryable.
pub async fn call_with_retry(
    generator: &dyn TextGenerator,
    request: &CompletionRequest,
    chain: &ModelChain,
    policy: &RetryPolicy,
    timeout: Duration,
    job_id: &JobId,
) -> CallOutcome {
    let mut request = request.clone();
    let mut attempts = 0u32;
    let mut retries = 0u32;
    let mut model_index = 0usize;

    loop {
        let model = chain.models()[model_index].clone();
        request.model_id = model.clone();
        attempts += 1;

        let result = match tokio::time::timeout(timeout, generator.generate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(format!(
                "no response within {}ms",
                timeout.as_millis()
            ))),
        };

        let error = match result {
            Ok(text) => {
                return CallOutcome {
                    result: Ok((text, model)),
                    attempts,
                }
            }
            Err(e) => e,
        };

        match error {
            GenerationError::ModelUnavailable(_) if model_index + 1 < chain.len() => {
                model_index += 1;
                tracing::warn!(
                    job_id = %job_id,
                    model = %model,
                    fallback = %chain.models()[model_index],
                    "Model unavailable, falling back"
                );
            }
            e if e.is_retryable() && retries < policy.max_retries => {
                let delay = policy.delay_after(retries, &e);
                log_retry_attempt!(job_id, attempts, delay, model, e);
                retries += 1;
                tokio::time::sleep(delay).await;
            }
            e => {
                return CallOutcome {
                    result: Err(e),
                    attempts,
                }
            }
        }
    }
}
