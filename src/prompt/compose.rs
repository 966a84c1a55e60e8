// Prompt composition from a validated request
// Author: kelexine (https://github.com/kelexine)

use super::{Field, OptionalField, PromptSections};
use crate::cache::normalize;
use crate::models::{ContentKind, GenerationRequest};
use crate::policy::{CostMode, CostModeProfile};
use phf::phf_map;

static TITLE_EXAMPLES: phf::Map<&'static str, [&'static str; 3]> = phf_map! {
    "technology|conference|professional" => ["Tech Leadership Summit", "Digital Innovation Forum", "Future Systems Expo"],
    "technology|workshop|creative" => ["Code & Create Lab", "Innovation Studio", "Digital Makers Hub"],
    "business|conference|professional" => ["Business Growth Summit", "Leadership Excellence Forum", "Strategic Success Conference"],
    "business|seminar|formal" => ["Executive Mastery Series", "Strategic Leadership Institute", "Business Excellence Summit"],
    "education|conference|innovative" => ["Learning Revolution Summit", "Educational Innovation Forum", "Teaching Excellence Expo"],
};

/// Known-good titles for a category / event type / tone combination.
///
/// Falls back to templated examples for combinations without a curated set.
pub fn title_examples(category: &str, event_type: &str, tone: &str) -> Vec<String> {
    let key = format!(
        "{}|{}|{}",
        normalize(category),
        normalize(event_type),
        normalize(tone)
    );

    match TITLE_EXAMPLES.get(key.as_str()) {
        Some(examples) => examples.iter().map(|e| e.to_string()).collect(),
        None => vec![
            format!("{} Excellence Summit", category.trim()),
            format!("{} Innovation Forum", event_type.trim()),
            format!("Advanced {} Workshop", category.trim()),
        ],
    }
}

/// Build the prompt sections for `request` under `profile`.
///
/// Structural fields go in `mandatory`; formatting rules, keywords, examples
/// and style guidance are optional with descending priority.
pub fn compose(request: &GenerationRequest, profile: &CostModeProfile) -> PromptSections {
    let tone = request.tone().trim();
    let mut mandatory = Vec::with_capacity(6);

    match request.kind() {
        ContentKind::Title => {
            mandatory.push(field(
                "Task",
                format!(
                    "Generate exactly {} unique event titles, 3-6 words each",
                    request.count()
                ),
            ));
        }
        ContentKind::Description => {
            mandatory.push(field(
                "Task",
                format!(
                    "Write an event description of at most {} characters",
                    request.max_chars()
                ),
            ));
            if let Some(title) = request.title() {
                mandatory.push(field("Title", title.trim().to_string()));
            }
        }
    }
    mandatory.push(field("Category", request.category().trim().to_string()));
    mandatory.push(field("Event type", request.event_type().trim().to_string()));
    mandatory.push(field("Tone", tone.to_string()));

    let mut optional = Vec::with_capacity(4);

    let format = match request.kind() {
        ContentKind::Title => "Return a JSON array of strings only. No colons, emojis or decorative symbols.",
        ContentKind::Description => "Write flowing paragraphs without bullet points. End with a strong call-to-action. No emojis or decorative symbols.",
    };
    optional.push(optional_field(3, "Format", format.to_string()));

    if !request.tags().is_empty() {
        optional.push(optional_field(2, "Keywords", request.tags().join(", ")));
    }

    match request.kind() {
        ContentKind::Title if profile.title_examples > 0 => {
            let examples: Vec<String> =
                title_examples(request.category(), request.event_type(), tone)
                    .into_iter()
                    .take(profile.title_examples)
                    .collect();
            optional.push(optional_field(1, "Examples", examples.join("; ")));
        }
        ContentKind::Description if profile.mode == CostMode::Premium => {
            optional.push(optional_field(
                1,
                "Structure",
                "Hook, problem, solution, benefits, call-to-action".to_string(),
            ));
        }
        _ => {}
    }

    let style = match request.kind() {
        ContentKind::Title => format!(
            "Please provide {} and memorable wording. Make sure to use different words and focus for each title.",
            tone.to_lowercase()
        ),
        ContentKind::Description => format!(
            "Please provide {} and compelling copy. It is important to include the value proposition and key benefits.",
            tone.to_lowercase()
        ),
    };
    optional.push(optional_field(0, "Style", style));

    PromptSections {
        mandatory,
        optional,
        context: request.context().map(|c| c.trim().to_string()),
    }
}

/// Prompt asking for `needed` more titles that differ from `existing`.
pub fn compose_top_up(request: &GenerationRequest, existing: &[String], needed: usize) -> PromptSections {
    let mut mandatory = vec![
        field(
            "Task",
            format!("Generate exactly {} additional unique event titles, 3-6 words each", needed),
        ),
        field("Category", request.category().trim().to_string()),
        field("Event type", request.event_type().trim().to_string()),
        field("Tone", request.tone().trim().to_string()),
    ];
    if !existing.is_empty() {
        mandatory.push(field("Avoid", existing.join("; ")));
    }

    PromptSections {
        mandatory,
        optional: vec![optional_field(
            3,
            "Format",
            "Return a JSON array of strings only.".to_string(),
        )],
        context: None,
    }
}

/// Prompt asking the model to continue `current` by roughly
/// `remaining_chars` characters.
pub fn compose_extension(request: &GenerationRequest, current: &str, remaining_chars: usize) -> PromptSections {
    let mut mandatory = vec![field(
        "Task",
        format!(
            "Extend this event description by about {} characters with more details, benefits or a call-to-action",
            remaining_chars
        ),
    )];
    if let Some(title) = request.title() {
        mandatory.push(field("Title", title.trim().to_string()));
    }
    mandatory.push(field("Tone", request.tone().trim().to_string()));
    mandatory.push(field("Current description", current.trim().to_string()));

    PromptSections {
        mandatory,
        optional: vec![optional_field(
            3,
            "Format",
            "Return only the new text to append. Do not repeat the current description.".to_string(),
        )],
        context: None,
    }
}

fn field(label: &'static str, value: String) -> Field {
    Field { label, value }
}

fn optional_field(priority: u8, label: &'static str, value: String) -> OptionalField {
    OptionalField {
        priority,
        label,
        value,
    }
}
