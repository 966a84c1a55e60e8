// Prompt compression toward a token ceiling
// Author: kelexine (https://github.com/kelexine)

use super::{estimate_tokens, PromptSections};
use crate::policy::Aggressiveness;
use tracing::debug;

/// Filler phrases removed under aggressive compression.
const FILLER: &[(&str, &str)] = &[
    ("Please provide", "Provide"),
    ("You should", ""),
    ("It is important to", ""),
    ("Make sure to", ""),
];

/// Shrink `sections` so its estimated token count fits `ceiling`.
///
/// Prompts already within the ceiling are returned unchanged. Otherwise the
/// target is `ceiling * aggressiveness.budget_ratio()` and these steps run in
/// order until the target is met:
///
/// 1. collapse whitespace (and strip filler phrases when aggressive)
/// 2. drop optional fields, lowest priority first
/// 3. truncate the context at a word boundary, or drop it
///
/// Mandatory fields are never removed, so the result exceeds `ceiling` only
/// when they alone do. The function is deterministic and idempotent.
pub fn compress(
    sections: &PromptSections,
    ceiling: usize,
    aggressiveness: Aggressiveness,
) -> PromptSections {
    let before = sections.estimated_tokens();
    if before <= ceiling {
        return sections.clone();
    }

    let budget = (ceiling as f64 * aggressiveness.budget_ratio()).floor() as usize;
    let mut out = tidy(sections, aggressiveness);

    while out.estimated_tokens() > budget {
        let Some(index) = lowest_priority(&out) else {
            break;
        };
        let dropped = out.optional.remove(index);
        debug!("Dropped optional prompt field '{}'", dropped.label);
    }

    if out.estimated_tokens() > budget {
        if let Some(context) = out.context.take() {
            out.context = truncate_context(&out, &context, budget);
        }
    }

    debug!(
        "Compressed prompt from ~{} to ~{} tokens (ceiling {}, budget {})",
        before,
        out.estimated_tokens(),
        ceiling,
        budget
    );
    out
}

fn tidy(sections: &PromptSections, aggressiveness: Aggressiveness) -> PromptSections {
    let strip = aggressiveness.strips_filler();

    let mandatory = sections
        .mandatory
        .iter()
        .map(|f| super::Field {
            label: f.label,
            value: collapse_whitespace(&f.value),
        })
        .collect();

    let optional = sections
        .optional
        .iter()
        .map(|f| super::OptionalField {
            priority: f.priority,
            label: f.label,
            value: clean_text(&f.value, strip),
        })
        .filter(|f| !f.value.is_empty())
        .collect();

    let context = sections
        .context
        .as_deref()
        .map(|c| clean_text(c, strip))
        .filter(|c| !c.is_empty());

    PromptSections {
        mandatory,
        optional,
        context,
    }
}

/// Whitespace collapse plus optional filler stripping, run to a fixpoint.
fn clean_text(text: &str, strip_filler: bool) -> String {
    let mut current = collapse_whitespace(text);
    if !strip_filler {
        return current;
    }

    loop {
        let mut next = current.clone();
        for (phrase, replacement) in FILLER {
            next = next.replace(phrase, replacement);
        }
        let next = collapse_whitespace(&next);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Index of the next optional field to drop; later fields lose ties.
fn lowest_priority(sections: &PromptSections) -> Option<usize> {
    sections
        .optional
        .iter()
        .enumerate()
        .min_by(|(ia, a), (ib, b)| a.priority.cmp(&b.priority).then(ib.cmp(ia)))
        .map(|(index, _)| index)
}

/// Longest word prefix of `context` that keeps `sections` within `budget`.
fn truncate_context(sections: &PromptSections, context: &str, budget: usize) -> Option<String> {
    let words: Vec<&str> = context.split_whitespace().collect();
    let base = sections.render();

    let fits = |n: usize| {
        let candidate = format!("{}\nContext: {}", base, words[..n].join(" "));
        estimate_tokens(&candidate) <= budget
    };

    // Token estimate grows with the prefix length, so binary search is valid
    let (mut lo, mut hi) = (0, words.len());
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }

    (lo > 0).then(|| words[..lo].join(" "))
}
