// Per-model token pricing used for cost estimates
// Author: kelexine (https://github.com/kelexine)

use crate::models::TokenUsage;
use phf::phf_map;

/// USD per 1,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        self.input_per_1k * (f64::from(usage.prompt_tokens) / 1000.0)
            + self.output_per_1k * (f64::from(usage.completion_tokens) / 1000.0)
    }
}

/// Flat estimate for models missing from the table.
pub const UNKNOWN_MODEL_COST_USD: f64 = 0.02;

static PRICING: phf::Map<&'static str, ModelPricing> = phf_map! {
    "gpt-3.5-turbo" => ModelPricing { input_per_1k: 0.0005, output_per_1k: 0.0015 },
    "gpt-4o-mini" => ModelPricing { input_per_1k: 0.00015, output_per_1k: 0.0006 },
    "gpt-4o" => ModelPricing { input_per_1k: 0.0025, output_per_1k: 0.01 },
    "gpt-4" => ModelPricing { input_per_1k: 0.03, output_per_1k: 0.06 },
};

pub fn pricing_for(model: &str) -> Option<&'static ModelPricing> {
    PRICING.get(model)
}

/// Estimated USD cost of a call. Zero usage costs nothing.
pub fn estimate_cost(model: &str, usage: &TokenUsage) -> f64 {
    if usage.is_zero() {
        return 0.0;
    }
    pricing_for(model)
        .map(|p| p.cost(usage))
        .unwrap_or(UNKNOWN_MODEL_COST_USD)
}
