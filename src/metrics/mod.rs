// Metrics module for Prometheus observability
// Author: kelexine (https://github.com/kelexine)

mod registry;

pub use registry::{
    gather_metrics,
    GENERATION_REQUESTS,
    GENERATION_DURATION,
    PROVIDER_CALLS,
    PROVIDER_RETRIES,
    TOKENS_TOTAL,
    COST_USD,
    CACHE_OPERATIONS,
    CACHE_ENTRIES,
};

/// Helper to record one finished generation request
pub fn record_generation(kind: &str, mode: &str, outcome: &str, duration_secs: f64) {
    GENERATION_REQUESTS
        .with_label_values(&[kind, mode, outcome])
        .inc();

    GENERATION_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Helper to record one outbound provider call
pub fn record_provider_call(outcome: &str) {
    PROVIDER_CALLS.with_label_values(&[outcome]).inc();
}

/// Helper to record a scheduled retry
pub fn record_retry(reason: &str) {
    PROVIDER_RETRIES.with_label_values(&[reason]).inc();
}

/// Helper to record token usage
pub fn record_tokens(mode: &str, prompt: u32, completion: u32) {
    if prompt > 0 {
        TOKENS_TOTAL
            .with_label_values(&[mode, "prompt"])
            .inc_by(prompt as f64);
    }
    if completion > 0 {
        TOKENS_TOTAL
            .with_label_values(&[mode, "completion"])
            .inc_by(completion as f64);
    }
}

/// Helper to record estimated spend (`saved == false`) or savings
pub fn record_cost(mode: &str, usd: f64, saved: bool) {
    if usd > 0.0 {
        let kind = if saved { "saved" } else { "spent" };
        COST_USD.with_label_values(&[mode, kind]).inc_by(usd);
    }
}

/// Helper to record cache operations
pub fn record_cache_op(operation: &str, count: u64) {
    if count > 0 {
        CACHE_OPERATIONS
            .with_label_values(&[operation])
            .inc_by(count as f64);
    }
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.with_label_values(&["active"]).set(count as f64);
}
