// Generation result and token accounting
// Author: kelexine (https://github.com/kelexine)

use super::request::ContentKind;
use crate::policy::CostMode;
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;
use uuid::Uuid;

/// Token usage reported by (or estimated for) a provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
    }
}

/// Successful outcome of `Orchestrator::generate`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub request_id: Uuid,
    pub kind: ContentKind,
    /// Final text. Titles are newline separated.
    pub content: String,
    pub served_from_cache: bool,
    /// Zero when served from cache.
    pub tokens: TokenUsage,
    pub estimated_cost_usd: f64,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    pub fingerprint: String,
    pub mode: CostMode,
    pub warnings: Vec<String>,
}

impl GenerationResult {
    /// Individual titles for a title request; empty for descriptions.
    pub fn titles(&self) -> Vec<&str> {
        match self.kind {
            ContentKind::Title => self
                .content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect(),
            ContentKind::Description => Vec::new(),
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
