//! Generation request model.
//!
//! A [`GenerationRequest`] is immutable once built. Use
//! [`GenerationRequest::titles`] or [`GenerationRequest::description`] to get a
//! [`RequestBuilder`], then call [`RequestBuilder::build`].
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::{EventForgeError, Result};
use crate::policy::CostMode;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Titles requested per call are clamped to this range.
pub const TITLE_COUNT_RANGE: std::ops::RangeInclusive<u8> = 1..=5;
/// Description lengths are clamped to this range (characters).
pub const MAX_CHARS_RANGE: std::ops::RangeInclusive<u32> = 100..=5000;

const DEFAULT_TITLE_COUNT: u8 = 3;
const DEFAULT_MAX_CHARS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Title,
    Description,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Title => "title",
            ContentKind::Description => "description",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single title or description generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    kind: ContentKind,
    category: String,
    event_type: String,
    tone: String,
    title: Option<String>,
    count: u8,
    max_chars: u32,
    context: Option<String>,
    tags: Vec<String>,
    mode: CostMode,
}

impl GenerationRequest {
    /// Start building a title request.
    pub fn titles(
        category: impl Into<String>,
        event_type: impl Into<String>,
        tone: impl Into<String>,
    ) -> RequestBuilder {
        RequestBuilder::new(ContentKind::Title, category.into(), event_type.into(), tone.into())
    }

    /// Start building a description request for an already chosen title.
    pub fn description(
        title: impl Into<String>,
        category: impl Into<String>,
        event_type: impl Into<String>,
        tone: impl Into<String>,
    ) -> RequestBuilder {
        let mut builder = RequestBuilder::new(
            ContentKind::Description,
            category.into(),
            event_type.into(),
            tone.into(),
        );
        builder.title = Some(title.into());
        builder
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn tone(&self) -> &str {
        &self.tone
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Number of titles requested (titles only).
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Target description length in characters (descriptions only).
    pub fn max_chars(&self) -> u32 {
        self.max_chars
    }

    /// Free-text context, `None` when absent or blank.
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn mode(&self) -> CostMode {
        self.mode
    }

    /// Check that every structural field is present.
    ///
    /// Form placeholders such as `"Select event category"` count as missing.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if is_blank_or_placeholder(&self.category) {
            missing.push("category");
        }
        if is_blank_or_placeholder(&self.event_type) {
            missing.push("event type");
        }
        if is_blank_or_placeholder(&self.tone) {
            missing.push("tone");
        }
        if self.kind == ContentKind::Description
            && self.title.as_deref().map_or(true, |t| t.trim().is_empty())
        {
            missing.push("title");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EventForgeError::Validation(format!(
                "{} required",
                missing.join(", ")
            )))
        }
    }
}

fn is_blank_or_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.to_ascii_lowercase().starts_with("select ")
}

/// Builder for [`GenerationRequest`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    kind: ContentKind,
    category: String,
    event_type: String,
    tone: String,
    title: Option<String>,
    count: u8,
    max_chars: u32,
    context: Option<String>,
    tags: Vec<String>,
    mode: CostMode,
}

impl RequestBuilder {
    fn new(kind: ContentKind, category: String, event_type: String, tone: String) -> Self {
        Self {
            kind,
            category,
            event_type,
            tone,
            title: None,
            count: DEFAULT_TITLE_COUNT,
            max_chars: DEFAULT_MAX_CHARS,
            context: None,
            tags: Vec::new(),
            mode: CostMode::default(),
        }
    }

    pub fn count(mut self, count: u8) -> Self {
        self.count = count;
        self
    }

    pub fn max_chars(mut self, max_chars: u32) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn maybe_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn mode(mut self, mode: CostMode) -> Self {
        self.mode = mode;
        self
    }

    /// Finish the request, clamping count and length constraints.
    ///
    /// Structural validation is left to [`GenerationRequest::validate`] so
    /// that the orchestrator can report it as its own stage.
    pub fn build(self) -> GenerationRequest {
        let count = self
            .count
            .clamp(*TITLE_COUNT_RANGE.start(), *TITLE_COUNT_RANGE.end());
        if count != self.count {
            debug!("Clamped title count {} to {}", self.count, count);
        }

        let max_chars = self
            .max_chars
            .clamp(*MAX_CHARS_RANGE.start(), *MAX_CHARS_RANGE.end());
        if max_chars != self.max_chars {
            debug!("Clamped max_chars {} to {}", self.max_chars, max_chars);
        }

        GenerationRequest {
            kind: self.kind,
            category: self.category,
            event_type: self.event_type,
            tone: self.tone,
            title: self.title,
            count,
            max_chars,
            context: self.context,
            tags: self.tags,
            mode: self.mode,
        }
    }
}
