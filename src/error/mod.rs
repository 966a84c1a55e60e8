// Error types for eventforge
// Author: kelexine (https://github.com/kelexine)

use crate::provider::{ProviderError, ProviderErrorKind};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventForgeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unsupported cost mode: '{0}' (expected economy, balanced or premium)")]
    InvalidMode(String),

    #[error("Transient provider error: {0}")]
    TransientProvider(ProviderError),

    #[error("Terminal provider error: {0}")]
    TerminalProvider(ProviderError),

    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ProviderError },

    #[error("Cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },

    #[error("Cache degraded: {0}")]
    CacheDegraded(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Config parsing error: {0}")]
    ConfigParsing(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ProviderError> for EventForgeError {
    fn from(error: ProviderError) -> Self {
        if error.is_transient() {
            EventForgeError::TransientProvider(error)
        } else {
            EventForgeError::TerminalProvider(error)
        }
    }
}

impl EventForgeError {
    /// The provider error underneath this one, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            EventForgeError::TransientProvider(e)
            | EventForgeError::TerminalProvider(e)
            | EventForgeError::RetriesExhausted { last: e, .. } => Some(e),
            _ => None,
        }
    }

    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            EventForgeError::Validation(_) | EventForgeError::InvalidMode(_) => {
                (StatusCode::BAD_REQUEST, "invalid_request_error")
            }
            EventForgeError::TerminalProvider(e) | EventForgeError::TransientProvider(e) => {
                match e.kind {
                    ProviderErrorKind::AuthError => {
                        (StatusCode::UNAUTHORIZED, "authentication_error")
                    }
                    ProviderErrorKind::ContentPolicy => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "content_policy_error")
                    }
                    ProviderErrorKind::InvalidRequest => {
                        (StatusCode::BAD_REQUEST, "invalid_request_error")
                    }
                    ProviderErrorKind::RateLimited => {
                        (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error")
                    }
                    ProviderErrorKind::Timeout | ProviderErrorKind::ServerError => {
                        (StatusCode::BAD_GATEWAY, "api_error")
                    }
                }
            }
            EventForgeError::RetriesExhausted { last, .. } => match last.kind {
                ProviderErrorKind::RateLimited => {
                    (StatusCode::TOO_MANY_REQUESTS, "rate_limit_error")
                }
                _ => (StatusCode::SERVICE_UNAVAILABLE, "retries_exhausted"),
            },
            EventForgeError::Cancelled { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "cancelled")
            }
            EventForgeError::Config(_) | EventForgeError::ConfigParsing(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "api_error"),
        }
    }
}

// Convert EventForgeError to HTTP responses for Axum
impl IntoResponse for EventForgeError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Pipeline stage a generation failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Validate,
    Compose,
    Invoke,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validate => "validate",
            Stage::Compose => "compose",
            Stage::Invoke => "invoke",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a single `generate` call.
///
/// Carries the stage that failed, the underlying cause and, when the
/// pipeline got far enough to build one, the compressed prompt that was
/// about to be (or was) sent upstream.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct GenerationError {
    pub stage: Stage,
    pub source: EventForgeError,
    pub compressed_prompt: Option<String>,
}

impl GenerationError {
    pub fn new(stage: Stage, source: EventForgeError) -> Self {
        Self {
            stage,
            source,
            compressed_prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.compressed_prompt = Some(prompt.into());
        self
    }

    /// Whether any work (a compressed prompt) was produced before failing.
    pub fn produced_partial_work(&self) -> bool {
        self.compressed_prompt.is_some()
    }
}

impl IntoResponse for GenerationError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.source.status_and_type();

        let body = json!({
            "type": "error",
            "error": {
                "type": error_type,
                "stage": self.stage.as_str(),
                "message": self.source.to_string(),
                "partial_work": self.produced_partial_work(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EventForgeError>;
