//! HTTP text generator for OpenAI-compatible APIs

use super::models::{ApiErrorEnvelope, ChatCompletionBody, ChatCompletionResponse, CompletionRequest};
use super::TextGenerator;
use crate::config::{GenerationConfig, SecretString};
use crate::domain::errors::{GenerationError, ScribeError};
use crate::domain::result::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, ClientBuilder, StatusCode};
use secrecy::ExposeSecret;
use std::time::Duration;

/// Text generator talking to `POST {base_url}/chat/completions`
///
/// # Example
///
/// ```no_run
/// use phiscribe::adapters::textgen::{HttpTextGenerator, TextGenerator, CompletionRequest};
/// use phiscribe::config::{secret_string, GenerationConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GenerationConfig {
///     api_key: Some(secret_string("sk-...".to_string())),
///     ..Default::default()
/// };
/// let client = HttpTextGenerator::new(&config)?;
/// let text = client
///     .generate(&CompletionRequest {
///         system_prompt: "Summarize the session".to_string(),
///         user_text: "[PATIENT_NAME] reports poor sleep".to_string(),
///         model_id: "gpt-4o".to_string(),
///         temperature: 0.3,
///         max_tokens: 512,
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpTextGenerator {
    /// Base URL without trailing slash
    base_url: String,

    /// HTTP client for making requests
    client: Client,

    /// Bearer token
    api_key: SecretString,
}

impl HttpTextGenerator {
    /// Create a new client from the generation configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the API key is missing or the HTTP
    /// client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ScribeError::Configuration("generation.api_key is not set".to_string()))?;

        let client = ClientBuilder::new()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ScribeError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate(&self, request: &CompletionRequest) -> std::result::Result<String, GenerationError> {
        let body = ChatCompletionBody::from_request(request);

        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret().as_ref())
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(resp.headers());
            let text = resp.text().await.unwrap_or_default();
            let err = map_status_error(status, retry_after, &text, &request.model_id);
            tracing::debug!(
                status = status.as_u16(),
                model = %request.model_id,
                error = %err,
                "Text generation request failed"
            );
            return Err(err);
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(format!("Failed to parse response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GenerationError::InvalidResponse("response contained no generated text".to_string()))
    }
}

fn map_transport_error(err: reqwest::Error) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Timeout(err.to_string())
    } else {
        GenerationError::Network(err.to_string())
    }
}

/// Maps a non-success status to the error the retry policy classifies
pub(crate) fn map_status_error(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    model_id: &str,
) -> GenerationError {
    let api_error = serde_json::from_str::<ApiErrorEnvelope>(body)
        .unwrap_or_default()
        .error;
    let message = if api_error.message.is_empty() {
        body.chars().take(200).collect()
    } else {
        api_error.message.clone()
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited { retry_after },
        s if s.is_server_error() => GenerationError::ServerError {
            status: s.as_u16(),
            message,
        },
        StatusCode::NOT_FOUND => GenerationError::ModelUnavailable(model_id.to_string()),
        _ if api_error.is_model_not_found() => GenerationError::ModelUnavailable(model_id.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GenerationError::Configuration(format!("{}: {message}", status.as_u16()))
        }
        s => GenerationError::Failed(format!("{}: {message}", s.as_u16())),
    }
}

/// Parses a `Retry-After` header given in seconds
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(Duration::from_secs_f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            map_status_error(StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(2)), "", "m"),
            GenerationError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
        assert!(matches!(
            map_status_error(StatusCode::BAD_GATEWAY, None, "oops", "m"),
            GenerationError::ServerError { status: 502, .. }
        ));
        assert_eq!(
            map_status_error(StatusCode::NOT_FOUND, None, "", "gpt-x"),
            GenerationError::ModelUnavailable("gpt-x".to_string())
        );
        assert!(matches!(
            map_status_error(StatusCode::UNAUTHORIZED, None, "", "m"),
            GenerationError::Configuration(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_REQUEST, None, "bad", "m"),
            GenerationError::Failed(_)
        ));
    }

    #[test]
    fn test_model_not_found_in_bad_request() {
        let body = r#"{"error":{"message":"The model `gpt-x` does not exist","code":"model_not_found"}}"#;
        assert_eq!(
            map_status_error(StatusCode::BAD_REQUEST, None, body, "gpt-x"),
            GenerationError::ModelUnavailable("gpt-x".to_string())
        );
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(3)));

        headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = GenerationConfig::default();
        assert!(matches!(
            HttpTextGenerator::new(&config),
            Err(ScribeError::Configuration(_))
        ));
    }
}
