//! Analytics events, snapshot and derived metrics.
//!
//! Only raw counters live in [`AnalyticsSnapshot`]; everything else (hit
//! rate, averages, efficiency score, recommendations) is derived on demand.
//!
//! Author: kelexine (<https://github.com/kelexine>)

use crate::error::Stage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Weight of the cache hit rate in the efficiency score.
const HIT_RATE_WEIGHT: f64 = 0.6;
/// Weight of normalized cost savings in the efficiency score.
const SAVINGS_WEIGHT: f64 = 0.4;

/// Outcome of one orchestrator invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    /// Served from cache. `reference_cost` is what the request's cost mode
    /// would normally spend.
    Hit {
        latency: Duration,
        reference_cost: f64,
    },
    Miss {
        tokens: u64,
        latency: Duration,
        cost: f64,
        reference_cost: f64,
        retries: u32,
    },
    /// `tokens` and `cost` cover provider calls that completed before the
    /// request failed.
    Failure {
        stage: Stage,
        latency: Duration,
        retries: u32,
        tokens: u64,
        cost: f64,
    },
}

/// Low-level cache operation reported by the cache store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    Lookup { hit: bool },
    Insert,
    Eviction,
    Expiration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounters {
    pub lookups: u64,
    pub lookup_hits: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Point-in-time copy of the aggregator's counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSnapshot {
    pub started_at: DateTime<Utc>,
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failures: u64,
    pub retries: u64,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    /// Reference cost avoided by cache hits.
    pub cost_saved_usd: f64,
    /// Sum of per-request savings fractions (hits count 1.0).
    pub savings_score: f64,
    #[serde(rename = "cumulative_latency_ms", serialize_with = "serialize_millis")]
    pub cumulative_latency: Duration,
    pub cache: CacheCounters,
}

impl AnalyticsSnapshot {
    pub(crate) fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            total_requests: 0,
            cache_hits: 0,
            cache_misses: 0,
            failures: 0,
            retries: 0,
            total_tokens: 0,
            total_cost_usd: 0.0,
            cost_saved_usd: 0.0,
            savings_score: 0.0,
            cumulative_latency: Duration::ZERO,
            cache: CacheCounters::default(),
        }
    }

    fn ratio(numerator: f64, denominator: u64) -> f64 {
        if denominator == 0 {
            0.0
        } else {
            numerator / denominator as f64
        }
    }

    /// hits / (hits + misses); 0 before any request.
    pub fn hit_rate(&self) -> f64 {
        Self::ratio(self.cache_hits as f64, self.cache_hits + self.cache_misses)
    }

    pub fn error_rate(&self) -> f64 {
        Self::ratio(self.failures as f64, self.total_requests)
    }

    pub fn average_latency(&self) -> Duration {
        if self.total_requests == 0 {
            Duration::ZERO
        } else {
            self.cumulative_latency
                .div_f64(self.total_requests as f64)
        }
    }

    pub fn average_cost(&self) -> f64 {
        Self::ratio(self.total_cost_usd, self.total_requests)
    }

    pub fn average_tokens(&self) -> f64 {
        Self::ratio(self.total_tokens as f64, self.total_requests)
    }

    /// Mean savings fraction over served requests, in `[0, 1]`.
    pub fn savings_ratio(&self) -> f64 {
        Self::ratio(self.savings_score, self.cache_hits + self.cache_misses)
    }

    /// Weighted hit rate and cost savings, scaled to `0..=100`.
    pub fn efficiency_score(&self) -> f64 {
        (HIT_RATE_WEIGHT * self.hit_rate() + SAVINGS_WEIGHT * self.savings_ratio()) * 100.0
    }

    /// Human-readable tuning suggestions derived from the counters.
    pub fn recommendations(&self) -> Vec<String> {
        if self.total_requests == 0 {
            return vec!["No requests recorded yet".to_string()];
        }

        let mut recommendations = Vec::new();

        let hit_rate = self.hit_rate();
        if hit_rate < 0.2 {
            recommendations.push(
                "Use similar content parameters to boost cache efficiency (target: 60%+)".to_string(),
            );
        } else if hit_rate < 0.5 {
            recommendations
                .push("Good cache performance - try reusing successful prompts".to_string());
        }

        let avg_cost = self.average_cost();
        if avg_cost > 0.008 {
            recommendations
                .push("High cost per request - switch to economy mode to reduce spend".to_string());
        } else if avg_cost > 0.005 {
            recommendations
                .push("Moderate costs - consider economy mode for non-critical requests".to_string());
        }

        let avg_latency = self.average_latency().as_secs_f64();
        if avg_latency > 8.0 {
            recommendations
                .push("Slow responses detected - cache hits will improve this significantly".to_string());
        } else if avg_latency > 5.0 {
            recommendations
                .push("Response time acceptable - will improve with cache hits".to_string());
        }

        if self.average_tokens() > 1500.0 {
            recommendations
                .push("High token usage - use economy mode to reduce prompt size".to_string());
        }

        if self.error_rate() > 0.05 {
            recommendations
                .push("Error rate detected - verify API key and network stability".to_string());
        }

        let score = self.efficiency_score();
        let summary = if score > 80.0 {
            "Excellent performance - system optimized"
        } else if score > 60.0 {
            "Good performance - minor optimizations available"
        } else if score > 40.0 {
            "Moderate efficiency - implement caching strategies"
        } else {
            "Low efficiency - review cost mode and enable caching"
        };
        recommendations.push(summary.to_string());

        recommendations
    }

    /// Counters plus derived metrics, for dashboards.
    pub fn report(&self) -> AnalyticsReport {
        AnalyticsReport {
            hit_rate: self.hit_rate(),
            error_rate: self.error_rate(),
            average_latency_ms: self.average_latency().as_millis() as u64,
            savings_ratio: self.savings_ratio(),
            efficiency_score: self.efficiency_score(),
            recommendations: self.recommendations(),
            snapshot: self.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    #[serde(flatten)]
    pub snapshot: AnalyticsSnapshot,
    pub hit_rate: f64,
    pub error_rate: f64,
    pub average_latency_ms: u64,
    pub savings_ratio: f64,
    pub efficiency_score: f64,
    pub recommendations: Vec<String>,
}

fn serialize_millis<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}
