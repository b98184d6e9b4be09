//! HTTP text generator tests against a mock OpenAI-compatible server

use mockito::{Matcher, Server, ServerGuard};
use phiscribe::adapters::textgen::{CompletionRequest, HttpTextGenerator, TextGenerator};
use phiscribe::config::{secret_string, GenerationConfig};
use phiscribe::domain::GenerationError;
use serde_json::json;
use std::time::Duration;

const PATH: &str = "/v1/chat/completions";

fn client(server: &ServerGuard) -> HttpTextGenerator {
    let config = GenerationConfig {
        base_url: format!("{}/v1/", server.url()),
        api_key: Some(secret_string("sk-test".to_string())),
        request_timeout_seconds: 5,
        ..Default::default()
    };
    HttpTextGenerator::new(&config).unwrap()
}

fn request() -> CompletionRequest {
    CompletionRequest {
        system_prompt: "Write the assessment section".to_string(),
        user_text: "[PATIENT_NAME] reports low mood".to_string(),
        model_id: "gpt-4o".to_string(),
        temperature: 0.2,
        max_tokens: 400,
    }
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

#[tokio::test]
async fn test_successful_completion() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", PATH)
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o",
            "max_tokens": 400,
            "messages": [
                { "role": "system", "content": "Write the assessment section" },
                { "role": "user", "content": "[PATIENT_NAME] reports low mood" }
            ]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(completion("[PATIENT_NAME] presents with low mood."))
        .create_async()
        .await;

    let text = client(&server).generate(&request()).await.unwrap();

    assert_eq!(text, "[PATIENT_NAME] presents with low mood.");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_with_retry_after() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(429)
        .with_header("retry-after", "7")
        .with_body(r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#)
        .create_async()
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();

    assert_eq!(
        err,
        GenerationError::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        }
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(500)
        .with_body(r#"{"error": {"message": "internal error"}}"#)
        .create_async()
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();

    assert!(matches!(err, GenerationError::ServerError { status: 500, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unknown_model() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(404)
        .with_body(
            r#"{"error": {"message": "The model `gpt-4o` does not exist", "code": "model_not_found"}}"#,
        )
        .create_async()
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();

    assert!(matches!(err, GenerationError::ModelUnavailable(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_bad_credentials() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key provided"}}"#)
        .create_async()
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();

    assert!(matches!(err, GenerationError::Configuration(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_empty_choices_is_invalid_response() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"choices": []}"#)
        .create_async()
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_non_json_body_is_invalid_response() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", PATH)
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let err = client(&server).generate(&request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_network_error() {
    let config = GenerationConfig {
        base_url: "http://127.0.0.1:1/v1".to_string(),
        api_key: Some(secret_string("sk-test".to_string())),
        ..Default::default()
    };
    let err = HttpTextGenerator::new(&config)
        .unwrap()
        .generate(&request())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::Network(_)));
    assert!(err.is_retryable());
}
