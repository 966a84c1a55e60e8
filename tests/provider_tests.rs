// OpenAI-compatible client tests against a mock HTTP server
// Author: kelexine (https://github.com/kelexine)

use eventforge::config::ProviderConfig;
use eventforge::policy::CostMode;
use eventforge::models::GenerationRequest;
use eventforge::provider::{OpenAiClient, ProviderErrorKind, TextGenerator};
use std::time::Duration;

fn client(server: &mockito::Server) -> OpenAiClient {
    let config = ProviderConfig {
        api_base_url: server.url(),
        api_key_env: "EVENTFORGE_TEST_UNUSED_KEY".to_string(),
        timeout_seconds: 5,
    };
    OpenAiClient::with_api_key(&config, "sk-test-key-123456").unwrap()
}

fn params() -> eventforge::policy::ModelParams {
    let request = GenerationRequest::titles("Technology", "Conference", "Professional").build();
    CostMode::Balanced.profile().model_params(&request)
}

#[tokio::test]
async fn test_successful_completion() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test-key-123456")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"model": "gpt-3.5-turbo", "max_tokens": 104}"#.to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "choices": [{"message": {"role": "assistant", "content": " [\"A B C\"] "}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}
            }"#,
        )
        .create_async()
        .await;

    let generated = tokio_test::assert_ok!(
        client(&server)
            .generate_text("Task: Generate 3 titles", &params())
            .await
    );

    mock.assert_async().await;
    assert_eq!(generated.text, r#"["A B C"]"#);
    assert_eq!(generated.usage.prompt_tokens, 42);
    assert_eq!(generated.usage.completion_tokens, 7);
}

#[tokio::test]
async fn test_missing_usage_is_estimated() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"content": "Hello there friend"}}]}"#)
        .create_async()
        .await;

    let generated = client(&server)
        .generate_text("Task: Generate titles", &params())
        .await
        .unwrap();

    assert!(generated.usage.prompt_tokens > 0);
    assert!(generated.usage.completion_tokens > 0);
}

#[tokio::test]
async fn test_rate_limit_with_retry_hint() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_header("retry-after", "3")
        .with_body(r#"{"error": {"message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded"}}"#)
        .create_async()
        .await;

    let error = tokio_test::assert_err!(client(&server).generate_text("prompt", &params()).await);

    assert_eq!(error.kind, ProviderErrorKind::RateLimited);
    assert!(error.is_transient());
    assert_eq!(error.retry_after, Some(Duration::from_secs(3)));
    assert!(error.message.contains("Rate limit reached"));
}

#[tokio::test]
async fn test_terminal_statuses() {
    let cases = [
        (401, r#"{"error": {"message": "Incorrect API key provided: sk-abc123456789", "code": "invalid_api_key"}}"#, ProviderErrorKind::AuthError),
        (400, r#"{"error": {"message": "Rejected", "code": "content_policy_violation"}}"#, ProviderErrorKind::ContentPolicy),
        (400, r#"{"error": {"message": "max_tokens too large", "type": "invalid_request_error"}}"#, ProviderErrorKind::InvalidRequest),
    ];

    for (status, body, expected) in cases {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(status)
            .with_body(body)
            .create_async()
            .await;

        let error = client(&server)
            .generate_text("prompt", &params())
            .await
            .unwrap_err();
        assert_eq!(error.kind, expected, "status {}", status);
        assert!(!error.is_transient());
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("upstream overloaded")
        .create_async()
        .await;

    let error = client(&server)
        .generate_text("prompt", &params())
        .await
        .unwrap_err();
    assert_eq!(error.kind, ProviderErrorKind::ServerError);
    assert!(error.message.contains("upstream overloaded"));
}

#[tokio::test]
async fn test_content_filter_finish_reason() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices": [{"message": {"content": null}, "finish_reason": "content_filter"}]}"#)
        .create_async()
        .await;

    let error = client(&server)
        .generate_text("prompt", &params())
        .await
        .unwrap_err();
    assert_eq!(error.kind, ProviderErrorKind::ContentPolicy);
}

#[test]
fn test_missing_api_key_is_config_error() {
    let config = ProviderConfig {
        api_base_url: "http://localhost".to_string(),
        api_key_env: "EVENTFORGE_TEST_DEFINITELY_UNSET_KEY".to_string(),
        timeout_seconds: 5,
    };
    let error = OpenAiClient::new(&config).err().unwrap();
    assert!(error.to_string().contains("EVENTFORGE_TEST_DEFINITELY_UNSET_KEY"));
}
