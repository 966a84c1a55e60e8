//! Outbound text generation capability.
//!
//! The orchestrator only sees the [`TextGenerator`] trait, so tests (and the
//! retry controller) can swap the real HTTP client for a scripted one.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod openai;

pub use openai::OpenAiClient;

use crate::models::TokenUsage;
use crate::policy::ModelParams;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure classes reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProviderErrorKind {
    RateLimited,
    Timeout,
    ServerError,
    InvalidRequest,
    AuthError,
    ContentPolicy,
}

impl ProviderErrorKind {
    /// Transient kinds are worth retrying; the rest are terminal.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited | ProviderErrorKind::Timeout | ProviderErrorKind::ServerError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::ServerError => "server_error",
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::AuthError => "auth_error",
            ProviderErrorKind::ContentPolicy => "content_policy",
        }
    }

    /// Classify an HTTP status code.
    ///
    /// `code` is the provider's machine-readable error code, used to tell
    /// content-policy rejections apart from other 400s.
    pub fn from_status(status: u16, code: Option<&str>) -> Self {
        match status {
            429 => ProviderErrorKind::RateLimited,
            408 => ProviderErrorKind::Timeout,
            401 | 403 => ProviderErrorKind::AuthError,
            500..=599 => ProviderErrorKind::ServerError,
            _ if code.map_or(false, |c| c.contains("content_policy") || c.contains("content_filter")) => {
                ProviderErrorKind::ContentPolicy
            }
            _ => ProviderErrorKind::InvalidRequest,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    /// Server-suggested wait before retrying.
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Text produced by one provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub text: String,
    pub usage: TokenUsage,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        params: &ModelParams,
    ) -> std::result::Result<Generated, ProviderError>;

    /// Short provider name for logs and metrics.
    fn name(&self) -> &str {
        "provider"
    }
}
