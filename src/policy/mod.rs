//! Cost mode policy.
//!
//! Maps a cost mode (`economy`, `balanced`, `premium`) to a read-only
//! [`CostModeProfile`]: prompt token ceiling, compression aggressiveness and
//! model sampling parameters. Every other component reads model parameters
//! from here.
//!
//! Author: kelexine (<https://github.com/kelexine>)

pub mod pricing;

use crate::error::{EventForgeError, Result};
use crate::models::{ContentKind, GenerationRequest};
use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostMode {
    Economy,
    #[default]
    Balanced,
    Premium,
}

impl CostMode {
    pub const ALL: [CostMode; 3] = [CostMode::Economy, CostMode::Balanced, CostMode::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostMode::Economy => "economy",
            CostMode::Balanced => "balanced",
            CostMode::Premium => "premium",
        }
    }

    pub fn profile(self) -> &'static CostModeProfile {
        match self {
            CostMode::Economy => &ECONOMY,
            CostMode::Balanced => &BALANCED,
            CostMode::Premium => &PREMIUM,
        }
    }
}

impl fmt::Display for CostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostMode {
    type Err = EventForgeError;

    fn from_str(s: &str) -> Result<Self> {
        profile_for(s).map(|profile| profile.mode)
    }
}

/// How hard the prompt compressor may squeeze once over the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggressiveness {
    Minimal,
    Moderate,
    Aggressive,
}

impl Aggressiveness {
    /// Fraction of the ceiling the compressor targets once it has to act.
    pub fn budget_ratio(&self) -> f64 {
        match self {
            Aggressiveness::Minimal => 1.0,
            Aggressiveness::Moderate => 0.75,
            Aggressiveness::Aggressive => 0.5,
        }
    }

    /// Whether filler phrases are stripped from optional text.
    pub fn strips_filler(&self) -> bool {
        matches!(self, Aggressiveness::Aggressive)
    }
}

/// Output token budget formula, per content kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputBudget {
    pub per_title: u32,
    pub title_base: u32,
    pub chars_per_token: f32,
    pub description_base: u32,
}

/// Process-wide constant settings for one cost mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CostModeProfile {
    pub mode: CostMode,
    /// Prompt token ceiling handed to the compressor.
    pub token_ceiling: usize,
    pub aggressiveness: Aggressiveness,
    pub model: &'static str,
    pub title_temperature: f32,
    pub description_temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub output: OutputBudget,
    /// Title examples included in the prompt (0 = none).
    pub title_examples: usize,
    /// Follow-up calls allowed to make up for missing titles.
    pub title_top_ups: u8,
    /// Whether short descriptions get one follow-up call to extend them.
    pub extends_descriptions: bool,
    /// Estimated cost of an uncached request in this mode (USD).
    pub reference_cost_usd: f64,
}

/// Sampling parameters sent with an outbound generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelParams {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl CostModeProfile {
    /// Model parameters for a request under this profile.
    pub fn model_params(&self, request: &GenerationRequest) -> ModelParams {
        let (temperature, max_output_tokens) = match request.kind() {
            ContentKind::Title => (
                self.title_temperature,
                self.output.per_title * u32::from(request.count()) + self.output.title_base,
            ),
            ContentKind::Description => (
                self.description_temperature,
                (request.max_chars() as f32 / self.output.chars_per_token) as u32
                    + self.output.description_base,
            ),
        };

        ModelParams {
            model: self.model.to_string(),
            temperature,
            max_output_tokens,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
        }
    }

    /// Parameters for a follow-up call asking for missing titles: a little
    /// more room and a little more variety than the first call.
    pub fn top_up_params(&self, request: &GenerationRequest) -> ModelParams {
        let mut params = self.model_params(request);
        params.max_output_tokens += 20;
        params.temperature = (params.temperature + 0.1).min(2.0);
        params
    }

    /// Parameters for a follow-up call adding `remaining_chars` to a
    /// description.
    pub fn extension_params(&self, request: &GenerationRequest, remaining_chars: usize) -> ModelParams {
        let mut params = self.model_params(request);
        params.max_output_tokens = (remaining_chars as f32 / 2.5) as u32 + 30;
        params
    }
}

static ECONOMY: CostModeProfile = CostModeProfile {
    mode: CostMode::Economy,
    token_ceiling: 300,
    aggressiveness: Aggressiveness::Aggressive,
    model: "gpt-3.5-turbo",
    title_temperature: 0.85,
    description_temperature: 0.7,
    top_p: 0.9,
    frequency_penalty: 0.6,
    presence_penalty: 0.4,
    output: OutputBudget {
        per_title: 15,
        title_base: 40,
        chars_per_token: 2.8,
        description_base: 50,
    },
    title_examples: 0,
    title_top_ups: 1,
    extends_descriptions: false,
    reference_cost_usd: 0.001,
};

static BALANCED: CostModeProfile = CostModeProfile {
    mode: CostMode::Balanced,
    token_ceiling: 600,
    aggressiveness: Aggressiveness::Moderate,
    model: "gpt-3.5-turbo",
    title_temperature: 0.85,
    description_temperature: 0.72,
    top_p: 0.9,
    frequency_penalty: 0.6,
    presence_penalty: 0.4,
    output: OutputBudget {
        per_title: 18,
        title_base: 50,
        chars_per_token: 2.6,
        description_base: 75,
    },
    title_examples: 2,
    title_top_ups: 1,
    extends_descriptions: true,
    reference_cost_usd: 0.002,
};

static PREMIUM: CostModeProfile = CostModeProfile {
    mode: CostMode::Premium,
    token_ceiling: 1200,
    aggressiveness: Aggressiveness::Minimal,
    model: "gpt-3.5-turbo",
    title_temperature: 0.9,
    description_temperature: 0.75,
    top_p: 0.9,
    frequency_penalty: 0.6,
    presence_penalty: 0.4,
    output: OutputBudget {
        per_title: 20,
        title_base: 60,
        chars_per_token: 2.5,
        description_base: 100,
    },
    title_examples: 3,
    title_top_ups: 2,
    extends_descriptions: true,
    reference_cost_usd: 0.004,
};

static PROFILES: phf::Map<&'static str, &'static CostModeProfile> = phf_map! {
    "economy" => &ECONOMY,
    "balanced" => &BALANCED,
    "premium" => &PREMIUM,
};

/// Look up the profile for a mode name.
///
/// Matching ignores case and surrounding whitespace. Anything else is an
/// [`EventForgeError::InvalidMode`]; there is no silent fallback.
pub fn profile_for(mode: &str) -> Result<&'static CostModeProfile> {
    let normalized = mode.trim().to_ascii_lowercase();
    PROFILES
        .get(normalized.as_str())
        .copied()
        .ok_or_else(|| EventForgeError::InvalidMode(mode.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_lookup() {
        assert_eq!(profile_for("economy").unwrap().mode, CostMode::Economy);
        assert_eq!(profile_for(" Premium ").unwrap().mode, CostMode::Premium);
        assert!(matches!(
            profile_for("ultra"),
            Err(EventForgeError::InvalidMode(m)) if m == "ultra"
        ));
    }

    #[test]
    fn test_profiles_are_ordered_by_cost() {
        let [economy, balanced, premium] = CostMode::ALL.map(CostMode::profile);
        assert!(economy.token_ceiling < balanced.token_ceiling);
        assert!(balanced.token_ceiling < premium.token_ceiling);
        assert!(economy.reference_cost_usd < premium.reference_cost_usd);
        assert_eq!(premium.aggressiveness, Aggressiveness::Minimal);
        assert_eq!(economy.aggressiveness, Aggressiveness::Aggressive);
    }

    #[test]
    fn test_model_params_budget() {
        let request = GenerationRequest::titles("Tech", "Conference", "Professional")
            .count(4)
            .build();
        let params = CostMode::Balanced.profile().model_params(&request);
        assert_eq!(params.max_output_tokens, 18 * 4 + 50);
        assert!((params.temperature - 0.85).abs() < f32::EPSILON);

        let request = GenerationRequest::description("Summit", "Tech", "Conference", "Formal")
            .max_chars(1000)
            .build();
        let params = CostMode::Economy.profile().model_params(&request);
        assert_eq!(params.max_output_tokens, (1000.0_f32 / 2.8) as u32 + 50);
    }

    #[test]
    fn test_follow_up_params() {
        let titles = GenerationRequest::titles("Tech", "Conference", "Professional")
            .count(3)
            .build();
        let params = CostMode::Premium.profile().top_up_params(&titles);
        assert_eq!(params.max_output_tokens, 20 * 3 + 60 + 20);
        assert!((params.temperature - 1.0).abs() < 1e-6);

        let description = GenerationRequest::description("Summit", "Tech", "Conference", "Formal")
            .max_chars(1000)
            .build();
        let params = CostMode::Balanced.profile().extension_params(&description, 500);
        assert_eq!(params.max_output_tokens, 200 + 30);
        assert!(!CostMode::Economy.profile().extends_descriptions);
        assert_eq!(CostMode::Premium.profile().title_top_ups, 2);
    }
}
