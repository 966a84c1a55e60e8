//! Cache configuration, entry and statistics models.

// Author: kelexine (https://github.com/kelexine)

use super::fingerprint::FingerprintKey;
use crate::models::TokenUsage;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Configuration for the response cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of live entries.
    pub capacity: usize,
    /// Entry lifetime, measured from insertion.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    /// Provides default values for cache configuration.
    ///
    /// - `capacity`: 100
    /// - `ttl`: 48 hours
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl: Duration::from_secs(48 * 60 * 60),
        }
    }
}

impl CacheConfig {
    /// Why this configuration cannot back a working cache, if it cannot.
    pub fn degraded_reason(&self) -> Option<&'static str> {
        if self.capacity == 0 {
            Some("capacity is 0")
        } else if self.ttl.is_zero() {
            Some("ttl is 0")
        } else {
            None
        }
    }
}

/// One cached generation.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub fingerprint: FingerprintKey,
    pub content: String,
    /// Usage of the call that produced `content`.
    pub usage: TokenUsage,
    pub created_at: Instant,
    pub last_access: Instant,
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn new(fingerprint: FingerprintKey, content: impl Into<String>, usage: TokenUsage) -> Self {
        let now = Instant::now();
        Self {
            fingerprint,
            content: content.into(),
            usage,
            created_at: now,
            last_access: now,
            hit_count: 0,
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.last_access = now;
        self.hit_count += 1;
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub capacity: usize,
    /// Stored entries, expired ones included until purged.
    pub entries: usize,
    pub ttl_seconds: u64,
}
