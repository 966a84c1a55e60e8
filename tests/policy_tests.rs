// Cost mode policy and pricing tests
// Author: kelexine (https://github.com/kelexine)

use eventforge::error::EventForgeError;
use eventforge::models::{GenerationRequest, TokenUsage};
use eventforge::policy::pricing::{estimate_cost, UNKNOWN_MODEL_COST_USD};
use eventforge::policy::{profile_for, Aggressiveness, CostMode};

#[test]
fn test_all_modes_resolve() {
    for mode in CostMode::ALL {
        let profile = profile_for(mode.as_str()).unwrap();
        assert_eq!(profile.mode, mode);
        assert_eq!(mode.as_str().parse::<CostMode>().unwrap(), mode);
    }
}

#[test]
fn test_unknown_mode_is_rejected() {
    for input in ["", "cheap", "balanced-plus", "PREMIUM!"] {
        match profile_for(input) {
            Err(EventForgeError::InvalidMode(mode)) => assert_eq!(mode, input),
            other => panic!("expected InvalidMode for {:?}, got {:?}", input, other.map(|p| p.mode)),
        }
    }
}

#[test]
fn test_balanced_is_default() {
    assert_eq!(CostMode::default(), CostMode::Balanced);
    let request = GenerationRequest::titles("Tech", "Meetup", "Fun").build();
    assert_eq!(request.mode(), CostMode::Balanced);
}

#[test]
fn test_compression_ordering() {
    let ratio = |mode: CostMode| mode.profile().aggressiveness.budget_ratio();
    assert!(ratio(CostMode::Economy) < ratio(CostMode::Balanced));
    assert!(ratio(CostMode::Balanced) < ratio(CostMode::Premium));
    assert!(Aggressiveness::Aggressive.strips_filler());
    assert!(!Aggressiveness::Moderate.strips_filler());
}

#[test]
fn test_description_budgets() {
    let request = GenerationRequest::description("AI Summit", "Tech", "Conference", "Formal")
        .max_chars(2600)
        .build();

    let balanced = CostMode::Balanced.profile().model_params(&request);
    assert_eq!(balanced.max_output_tokens, 1000 + 75);
    assert!((balanced.temperature - 0.72).abs() < f32::EPSILON);

    let premium = CostMode::Premium.profile().model_params(&request);
    assert_eq!(premium.max_output_tokens, 1040 + 100);
}

#[test]
fn test_pricing() {
    let usage = TokenUsage::new(1000, 1000);
    let cost = estimate_cost("gpt-3.5-turbo", &usage);
    assert!((cost - 0.002).abs() < 1e-12);

    assert_eq!(estimate_cost("mystery-model", &usage), UNKNOWN_MODEL_COST_USD);
    assert_eq!(estimate_cost("gpt-3.5-turbo", &TokenUsage::default()), 0.0);
}
