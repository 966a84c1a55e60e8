// Prometheus metrics registry and collectors
// Author: kelexine (https://github.com/kelexine)

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, GaugeVec, HistogramVec, Opts, Registry, TextEncoder, Encoder,
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_histogram_vec_with_registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // GENERATION METRICS
    // ============================================================================

    /// Total generation requests by outcome (hit, miss, failure)
    pub static ref GENERATION_REQUESTS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("generation_requests_total", "Total generation requests"),
        &["kind", "mode", "outcome"],
        REGISTRY
    ).unwrap();

    /// End-to-end generation latency
    pub static ref GENERATION_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("generation_duration_seconds", "Generation latency in seconds")
            .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["outcome"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // PROVIDER METRICS
    // ============================================================================

    /// Outbound provider calls by outcome
    pub static ref PROVIDER_CALLS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("provider_calls_total", "Total outbound provider calls"),
        &["outcome"], // outcome: success or an error kind
        REGISTRY
    ).unwrap();

    /// Retries scheduled after transient provider failures
    pub static ref PROVIDER_RETRIES: CounterVec = register_counter_vec_with_registry!(
        Opts::new("provider_retries_total", "Total provider call retries"),
        &["reason"], // reason: rate_limited, timeout, server_error
        REGISTRY
    ).unwrap();

    // ============================================================================
    // TOKEN AND COST METRICS
    // ============================================================================

    /// Total tokens consumed
    pub static ref TOKENS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("tokens_total", "Total tokens consumed"),
        &["mode", "type"], // type: prompt, completion
        REGISTRY
    ).unwrap();

    /// Estimated spend and savings in USD
    pub static ref COST_USD: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cost_usd_total", "Estimated provider cost in USD"),
        &["mode", "type"], // type: spent, saved
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["operation"], // operation: hit, miss, insert, eviction, expiration
        REGISTRY
    ).unwrap();

    /// Current cache entries
    pub static ref CACHE_ENTRIES: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_entries_current", "Current number of cache entries"),
        &["type"], // type: active
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
