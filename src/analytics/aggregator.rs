// Process-wide analytics aggregator
// Author: kelexine (https://github.com/kelexine)

use super::models::{AnalyticsEvent, AnalyticsSnapshot, CacheEvent};
use crate::metrics;
use chrono::Utc;
use parking_lot::Mutex;

/// Thread-safe counters for every served, cached and failed request.
///
/// All counters for one event are updated under a single lock, so a
/// snapshot never observes a half-recorded event.
#[derive(Debug)]
pub struct Analytics {
    counters: Mutex<AnalyticsSnapshot>,
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}

impl Analytics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(AnalyticsSnapshot::empty(Utc::now())),
        }
    }

    /// Record the outcome of one orchestrator invocation.
    pub fn record(&self, event: &AnalyticsEvent) {
        let mut counters = self.counters.lock();
        counters.total_requests += 1;

        match *event {
            AnalyticsEvent::Hit {
                latency,
                reference_cost,
            } => {
                counters.cache_hits += 1;
                counters.cumulative_latency += latency;
                counters.cost_saved_usd += reference_cost.max(0.0);
                counters.savings_score += 1.0;
            }
            AnalyticsEvent::Miss {
                tokens,
                latency,
                cost,
                reference_cost,
                retries,
            } => {
                counters.cache_misses += 1;
                counters.total_tokens += tokens;
                counters.total_cost_usd += cost.max(0.0);
                counters.cumulative_latency += latency;
                counters.retries += u64::from(retries);
                counters.savings_score += miss_savings(cost, reference_cost);
            }
            AnalyticsEvent::Failure {
                latency,
                retries,
                tokens,
                cost,
                ..
            } => {
                counters.failures += 1;
                counters.total_tokens += tokens;
                counters.total_cost_usd += cost.max(0.0);
                counters.cumulative_latency += latency;
                counters.retries += u64::from(retries);
            }
        }
    }

    /// Record `count` occurrences of a cache operation.
    pub fn record_cache(&self, event: CacheEvent, count: u64) {
        if count == 0 {
            return;
        }

        let operation = {
            let mut counters = self.counters.lock();
            let cache = &mut counters.cache;
            match event {
                CacheEvent::Lookup { hit } => {
                    cache.lookups += count;
                    if hit {
                        cache.lookup_hits += count;
                        "hit"
                    } else {
                        "miss"
                    }
                }
                CacheEvent::Insert => {
                    cache.inserts += count;
                    "insert"
                }
                CacheEvent::Eviction => {
                    cache.evictions += count;
                    "eviction"
                }
                CacheEvent::Expiration => {
                    cache.expirations += count;
                    "expiration"
                }
            }
        };

        metrics::record_cache_op(operation, count);
    }

    /// Consistent copy of every counter.
    pub fn snapshot(&self) -> AnalyticsSnapshot {
        self.counters.lock().clone()
    }
}

/// Fraction of the mode's reference cost a generated response did not spend.
fn miss_savings(cost: f64, reference_cost: f64) -> f64 {
    if reference_cost <= 0.0 {
        return 0.0;
    }
    (1.0 - cost / reference_cost).clamp(0.0, 1.0)
}
