// Post-processing of raw model output
// Author: kelexine (https://github.com/kelexine)

use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Accepted title length in words.
const TITLE_WORDS: RangeInclusive<usize> = 3..=6;

/// Titles parsed from a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedTitles {
    pub titles: Vec<String>,
    /// Some titles came from the deterministic fallback list.
    pub fallback_used: bool,
    /// The response was not a clean JSON array.
    pub parse_issue: Option<String>,
}

/// Strip a surrounding markdown code fence, with or without a `json` tag.
pub fn clean_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest.trim();
    }
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim();
    }
    text
}

/// Parse exactly `count` distinct titles out of `raw`.
///
/// A JSON array is preferred; anything else is split on commas and newlines.
/// Titles outside 3-6 words are discarded, duplicates are removed
/// case-insensitively, and any shortfall is filled from templated fallbacks.
pub fn shape_titles(
    raw: &str,
    count: usize,
    category: &str,
    event_type: &str,
    tone: &str,
) -> ShapedTitles {
    let mut collector = TitleCollector::new(count);
    collector.absorb(raw);
    collector.finish(category, event_type, tone)
}

/// Accumulates distinct titles across one or more model responses.
#[derive(Debug, Clone)]
pub struct TitleCollector {
    count: usize,
    titles: Vec<String>,
    seen: HashSet<String>,
    parse_issue: Option<String>,
}

impl TitleCollector {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            titles: Vec::with_capacity(count),
            seen: HashSet::new(),
            parse_issue: None,
        }
    }

    /// Take valid titles from one raw response, up to the requested count.
    /// Returns how many were accepted.
    pub fn absorb(&mut self, raw: &str) -> usize {
        let cleaned = clean_fences(raw);
        let candidates = match serde_json::from_str::<serde_json::Value>(cleaned) {
            Ok(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect(),
            Ok(_) => {
                self.note_issue("response is not a JSON list".to_string());
                loose_titles(cleaned)
            }
            Err(e) => {
                self.note_issue(e.to_string());
                loose_titles(cleaned)
            }
        };

        let before = self.titles.len();
        for candidate in candidates {
            if self.missing() == 0 {
                break;
            }
            self.push(candidate.trim());
        }
        self.titles.len() - before
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    /// Titles still needed to reach the requested count.
    pub fn missing(&self) -> usize {
        self.count.saturating_sub(self.titles.len())
    }

    /// Fill any shortfall from templated fallbacks.
    pub fn finish(mut self, category: &str, event_type: &str, tone: &str) -> ShapedTitles {
        let (category, event_type, tone) = (category.trim(), event_type.trim(), tone.trim());
        let mut fallback_used = false;
        for candidate in fallback_titles(category, event_type, tone) {
            if self.missing() == 0 {
                break;
            }
            fallback_used |= self.push(&candidate);
        }

        let mut i = 1;
        while self.missing() > 0 {
            let filler = format!("{} {} {}", category, event_type, i);
            if self.seen.insert(filler.to_lowercase()) {
                self.titles.push(filler);
                fallback_used = true;
            }
            i += 1;
        }

        ShapedTitles {
            titles: self.titles,
            fallback_used,
            parse_issue: self.parse_issue,
        }
    }

    fn push(&mut self, title: &str) -> bool {
        if TITLE_WORDS.contains(&title.split_whitespace().count())
            && self.seen.insert(title.to_lowercase())
        {
            self.titles.push(title.to_string());
            true
        } else {
            false
        }
    }

    fn note_issue(&mut self, issue: String) {
        self.parse_issue.get_or_insert(issue);
    }
}

fn loose_titles(text: &str) -> Vec<String> {
    text.split(|c| c == ',' || c == '\n')
        .map(|line| {
            line.trim()
                .trim_matches(|c: char| {
                    matches!(c, '[' | ']' | '"' | '\'' | '-' | '*' | '.')
                        || c.is_ascii_digit()
                        || c.is_whitespace()
                })
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

fn fallback_titles(category: &str, event_type: &str, tone: &str) -> Vec<String> {
    vec![
        format!("{} Excellence Summit", category),
        format!("Future of {}", category),
        format!("{} {} Experience", tone, event_type),
        format!("Next-Gen {} Forum", category),
        format!("Advanced {} Series", event_type),
        format!("{} Innovation Hub", category),
        format!("Premier {} Event", event_type),
        format!("{} {} Gathering", tone, category),
        format!("Professional {} Network", event_type),
        format!("Elite {} Conference", category),
    ]
}

/// Append a model-written `extension` to `description`.
///
/// Returns `None` when the extension is empty or just restates the
/// description from the start.
pub fn extend_description(description: &str, extension: &str) -> Option<String> {
    let description = description.trim();
    let extension = clean_fences(extension);
    if extension.is_empty() {
        return None;
    }

    let opening: String = description.chars().take(20).collect::<String>().to_lowercase();
    if extension.to_lowercase().starts_with(&opening) {
        return None;
    }
    Some(format!("{} {}", description, extension))
}

/// Trim a description to `max_chars`, ending on the last full sentence when
/// the cut lands mid-sentence.
pub fn fit_description(raw: &str, max_chars: usize) -> (String, bool) {
    let text = raw.trim();
    if text.chars().count() <= max_chars {
        return (text.to_string(), false);
    }

    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = match cut.rfind('.') {
        Some(end) => cut[..=end].to_string(),
        None => cut,
    };
    (trimmed, true)
}
