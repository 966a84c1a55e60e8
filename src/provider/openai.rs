// OpenAI-compatible chat-completions client
// Author: kelexine (https://github.com/kelexine)

use super::{Generated, ProviderError, ProviderErrorKind, TextGenerator};
use crate::config::ProviderConfig;
use crate::error::{EventForgeError, Result};
use crate::models::TokenUsage;
use crate::policy::ModelParams;
use crate::prompt::estimate_tokens;
use crate::utils::logging::sanitize;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Longest server-suggested wait we honour.
const MAX_RETRY_HINT_SECS: f64 = 60.0;

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiClient {
    http_client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured env var.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            EventForgeError::Config(format!(
                "API key not found: set the {} environment variable",
                config.api_key_env
            ))
        })?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &ProviderConfig, api_key: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .use_rustls_tls()
            .build()
            .map_err(|e| EventForgeError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Created HTTP client for {}", config.api_base_url);

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    /// Extract message and code from an OpenAI-style error body
    fn extract_error(response_text: &str) -> (Option<String>, Option<String>) {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
            code: Option<String>,
            #[serde(rename = "type")]
            error_type: Option<String>,
        }

        match serde_json::from_str::<ErrorResponse>(response_text) {
            Ok(ErrorResponse { error: Some(detail) }) => {
                (detail.message, detail.code.or(detail.error_type))
            }
            _ => (None, None),
        }
    }

    fn transport_error(e: reqwest::Error) -> ProviderError {
        let kind = if e.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::ServerError
        };
        ProviderError::new(kind, format!("HTTP error: {}", e))
    }
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        params: &ModelParams,
    ) -> std::result::Result<Generated, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!("Calling chat completions for model: {}", params.model);

        let request = ChatRequest {
            model: &params.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: params.max_output_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Provider error: HTTP {} - Response body: {}",
                status,
                sanitize(&error_text)
            );
            let (message, code) = Self::extract_error(&error_text);
            let kind = ProviderErrorKind::from_status(status.as_u16(), code.as_deref());
            return Err(ProviderError::new(
                kind,
                format!("HTTP {}: {}", status.as_u16(), message.unwrap_or(error_text)),
            )
            .with_retry_after(retry_after));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::new(
                ProviderErrorKind::ServerError,
                format!("Response parsing error: {}", e),
            )
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::ServerError, "Response contained no choices")
        })?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(ProviderError::new(
                ProviderErrorKind::ContentPolicy,
                "Completion was withheld by the content filter",
            ));
        }

        let text = choice.message.content.unwrap_or_default().trim().to_string();
        let usage = match body.usage {
            Some(u) => TokenUsage::new(u.prompt_tokens, u.completion_tokens),
            None => TokenUsage::new(estimate_tokens(prompt) as u32, estimate_tokens(&text) as u32),
        };

        debug!("Received {} completion tokens", usage.completion_tokens);
        Ok(Generated { text, usage })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Read the server's retry hint from `retry-after-ms` or `retry-after`.
///
/// Returns `None` when absent or unparsable; caps at 60 seconds.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(ms) = headers
        .get("retry-after-ms")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
    {
        return Some(capped_seconds(ms / 1000.0));
    }

    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_duration_string)
}

/// Parse duration strings like "40", "1.5s", "0.457639761s"
/// Returns duration, capped at 60 seconds
fn parse_duration_string(duration_str: &str) -> Option<Duration> {
    let trimmed = duration_str.trim();
    let seconds_str = trimmed.strip_suffix('s').unwrap_or(trimmed);
    let seconds: f64 = seconds_str.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some(capped_seconds(seconds))
}

fn capped_seconds(seconds: f64) -> Duration {
    let millis = (seconds.clamp(0.0, MAX_RETRY_HINT_SECS) * 1000.0) as u64;
    Duration::from_millis(millis)
}
