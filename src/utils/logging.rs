//! Structured logging and security-focused trace utilities.
//!
//! This module configures the `tracing` ecosystem for the application,
//! supporting multiple output formats and providing utilities to prevent
//! sensitive data (like provider API keys) from leaking into logs.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::config::LoggingConfig;
use crate::error::{EventForgeError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static SANITIZE_ENABLED: AtomicBool = AtomicBool::new(true);

static API_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sk-[A-Za-z0-9_\-]{6,}").expect("valid api key pattern"));

static BEARER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Bearer\s+[^\s'\x22]+").expect("valid bearer pattern"));

/// Initializes the global tracing subscriber for the application.
///
/// Supports two output formats:
/// - `json`: Structured JSON logs for production ingestion.
/// - `pretty` (default): Human-readable, colorized output for development.
///
/// Log levels are controlled via the `RUST_LOG` environment variable or
/// the provided `LoggingConfig`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    SANITIZE_ENABLED.store(config.sanitize_tokens, Ordering::Relaxed);

    // Configure filter from environment or config file
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| EventForgeError::Config(format!("Invalid log level: {}", e)))?;

    let registry = tracing_subscriber::registry().with(env_filter);

    let initialized = match config.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    initialized.map_err(|e| EventForgeError::Internal(format!("Logging already initialized: {}", e)))
}

/// Sanitizes sensitive information from log messages.
///
/// Replaces OpenAI-style secret keys (`sk-...`) and bearer tokens with
/// placeholders. Returns the input unchanged when sanitizing was turned off
/// through `LoggingConfig::sanitize_tokens`.
pub fn sanitize(input: &str) -> String {
    if !SANITIZE_ENABLED.load(Ordering::Relaxed) {
        return input.to_string();
    }

    let redacted = API_KEY.replace_all(input, "[REDACTED_API_KEY]");
    BEARER
        .replace_all(&redacted, "Bearer [REDACTED_TOKEN]")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_api_key() {
        let input = "Incorrect API key provided: sk-proj-abc123XYZ789. You can find your key";
        let output = sanitize(input);
        assert!(output.contains("[REDACTED_API_KEY]"));
        assert!(!output.contains("abc123XYZ789"));
    }

    #[test]
    fn test_sanitize_bearer_token() {
        let input = "Authorization: Bearer abc.def.ghi";
        let output = sanitize(input);
        assert_eq!(output, "Authorization: Bearer [REDACTED_TOKEN]");
    }

    #[test]
    fn test_sanitize_leaves_plain_text() {
        assert_eq!(sanitize("rate limit reached"), "rate limit reached");
    }
}
