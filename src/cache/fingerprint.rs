// Request fingerprinting for cache keys
// Author: kelexine (https://github.com/kelexine)

use crate::models::{ContentKind, GenerationRequest};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// SHA-256 hex digest identifying semantically identical requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FingerprintKey(String);

impl FingerprintKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(16)]
    }
}

impl fmt::Display for FingerprintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which optional request attributes take part in the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyPolicy {
    /// When false (default) a response generated under one cost mode is
    /// reused for the same request under any other mode.
    pub include_cost_mode: bool,
}

/// Compute the cache key for `request`.
///
/// Free text is lower-cased and whitespace-collapsed, tags are sorted and
/// de-duplicated, and fields are hashed in a fixed order with labels and
/// separators so that values cannot bleed into neighbouring fields.
pub fn fingerprint(request: &GenerationRequest, policy: KeyPolicy) -> FingerprintKey {
    let mut hasher = Sha256::new();

    let mut field = |label: &str, value: &str| {
        hasher.update(label.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"\x1f");
    };

    field("kind", request.kind().as_str());
    field("category", &normalize(request.category()));
    field("event_type", &normalize(request.event_type()));
    field("tone", &normalize(request.tone()));
    field("title", &request.title().map(normalize).unwrap_or_default());

    // Only the constraint that shapes the output of this kind participates
    match request.kind() {
        ContentKind::Title => field("count", &request.count().to_string()),
        ContentKind::Description => field("max_chars", &request.max_chars().to_string()),
    }

    field("context", &request.context().map(normalize).unwrap_or_default());

    let mut tags: Vec<String> = request
        .tags()
        .iter()
        .map(|t| normalize(t))
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    field("tags", &tags.join(","));

    if policy.include_cost_mode {
        field("mode", request.mode().as_str());
    }

    FingerprintKey(hex::encode(hasher.finalize()))
}

/// Lower-case and collapse runs of whitespace to single spaces.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
