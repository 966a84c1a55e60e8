// Usage analytics: request outcomes, cache efficiency, cost savings
// Author: kelexine (https://github.com/kelexine)

mod aggregator;
mod models;

pub use aggregator::Analytics;
pub use models::{AnalyticsEvent, AnalyticsReport, AnalyticsSnapshot, CacheCounters, CacheEvent};
