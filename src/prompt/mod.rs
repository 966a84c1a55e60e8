//! Prompt construction and cost-driven compression.
//!
//! A prompt is held as [`PromptSections`] rather than a flat string so the
//! compressor can tell structural fields (never dropped) from optional
//! guidance and free-text context.
//!
//! Author: kelexine (<https://github.com/kelexine>)

mod compose;
mod compress;

pub use compose::{compose, compose_extension, compose_top_up, title_examples};
pub use compress::compress;

use serde::Serialize;

/// A structural field. Always rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub label: &'static str,
    pub value: String,
}

/// Optional guidance, dropped lowest `priority` first under compression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionalField {
    pub priority: u8,
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptSections {
    pub mandatory: Vec<Field>,
    pub optional: Vec<OptionalField>,
    pub context: Option<String>,
}

impl PromptSections {
    /// Render as the single prompt string sent to the provider.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self
            .mandatory
            .iter()
            .map(|f| format!("{}: {}", f.label, f.value))
            .collect();

        lines.extend(
            self.optional
                .iter()
                .map(|f| format!("{}: {}", f.label, f.value)),
        );

        if let Some(context) = &self.context {
            lines.push(format!("Context: {}", context));
        }

        lines.join("\n")
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.render())
    }

    /// The same prompt with every optional part removed.
    pub fn mandatory_only(&self) -> Self {
        Self {
            mandatory: self.mandatory.clone(),
            optional: Vec::new(),
            context: None,
        }
    }
}

/// Rough token estimate: the larger of the word count and chars / 3.5.
pub fn estimate_tokens(text: &str) -> usize {
    let words = text.split_whitespace().count();
    let by_chars = (text.chars().count() as f64 / 3.5) as usize;
    words.max(by_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        // 7 chars / 3.5 = 2, one word
        assert_eq!(estimate_tokens("Summit!"), 2);
        // many short words: word count dominates
        assert_eq!(estimate_tokens("a b c d e"), 5);
    }

    #[test]
    fn test_render_order() {
        let sections = PromptSections {
            mandatory: vec![Field {
                label: "Category",
                value: "Technology".into(),
            }],
            optional: vec![OptionalField {
                priority: 1,
                label: "Style",
                value: "bold".into(),
            }],
            context: Some("AI".into()),
        };
        assert_eq!(
            sections.render(),
            "Category: Technology\nStyle: bold\nContext: AI"
        );
        assert_eq!(sections.mandatory_only().render(), "Category: Technology");
    }
}
