// Bounded LRU response cache with lazy TTL expiry
// Author: kelexine (https://github.com/kelexine)

use super::fingerprint::FingerprintKey;
use super::models::{CacheConfig, CacheEntry, CacheStats};
use crate::analytics::{Analytics, CacheEvent};
use crate::error::EventForgeError;
use crate::metrics;
use lru::LruCache;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Cache of generated content keyed by request fingerprint.
///
/// `get` and `put` never fail. A configuration that cannot hold anything
/// (capacity or TTL of zero) turns the cache into a no-op.
pub struct ResponseCache {
    config: CacheConfig,
    enabled: bool,
    entries: Mutex<LruCache<FingerprintKey, CacheEntry>>,
    analytics: Option<Arc<Analytics>>,
}

impl ResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        let enabled = match config.degraded_reason() {
            Some(reason) => {
                let degraded = EventForgeError::CacheDegraded(reason.to_string());
                warn!("{}; every lookup will miss", degraded);
                false
            }
            None => true,
        };

        Self {
            config,
            enabled,
            // Capacity is enforced by `put` so expired entries can be purged first
            entries: Mutex::new(LruCache::unbounded()),
            analytics: None,
        }
    }

    /// Report cache operations to `analytics` as well as Prometheus.
    pub fn with_analytics(mut self, analytics: Arc<Analytics>) -> Self {
        self.analytics = Some(analytics);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live entry, marking it most recently used.
    ///
    /// Expired entries are reported as absent but stay in place until a
    /// `put` needs their slot.
    pub fn get(&self, key: &FingerprintKey) -> Option<CacheEntry> {
        if !self.enabled {
            self.report(CacheEvent::Lookup { hit: false }, 1);
            return None;
        }

        let now = Instant::now();
        let found = {
            let mut entries = self.entries.lock();
            let live = entries
                .peek(key)
                .map_or(false, |entry| !entry.is_expired(self.config.ttl, now));

            if live {
                entries.get_mut(key).map(|entry| {
                    entry.touch(now);
                    entry.clone()
                })
            } else {
                None
            }
        };

        match &found {
            Some(entry) => debug!("Cache hit {} (hits: {})", key.short(), entry.hit_count),
            None => debug!("Cache miss {}", key.short()),
        }
        self.report(CacheEvent::Lookup { hit: found.is_some() }, 1);
        found
    }

    /// Store an entry, making room if the cache is full.
    ///
    /// Expired entries are purged first; if that frees nothing, the least
    /// recently used entry goes, ties broken by the lowest hit count.
    pub fn put(&self, key: FingerprintKey, entry: CacheEntry) {
        if !self.enabled {
            return;
        }

        let now = Instant::now();
        let (expired, evicted, len) = {
            let mut entries = self.entries.lock();
            let mut expired = 0;
            let mut evicted = 0;

            if !entries.contains(&key) && entries.len() >= self.config.capacity {
                expired = purge_expired(&mut entries, self.config.ttl, now);
                while entries.len() >= self.config.capacity {
                    if pop_victim(&mut entries).is_none() {
                        break;
                    }
                    evicted += 1;
                }
            }

            entries.put(key.clone(), entry);
            (expired, evicted, entries.len())
        };

        debug!(
            "Cached {} ({} entries, {} expired, {} evicted)",
            key.short(),
            len,
            expired,
            evicted
        );
        self.report(CacheEvent::Expiration, expired as u64);
        self.report(CacheEvent::Eviction, evicted as u64);
        self.report(CacheEvent::Insert, 1);
        metrics::update_cache_entries(len);
    }

    /// Explicit maintenance pass.
    ///
    /// Removes every expired entry; when none had expired, removes the single
    /// entry `put` would pick as its eviction victim. Returns how many
    /// entries were removed.
    pub fn evict(&self) -> usize {
        let now = Instant::now();
        let (expired, evicted, len) = {
            let mut entries = self.entries.lock();
            let expired = purge_expired(&mut entries, self.config.ttl, now);
            let evicted = if expired == 0 {
                usize::from(pop_victim(&mut entries).is_some())
            } else {
                0
            };
            (expired, evicted, entries.len())
        };

        self.report(CacheEvent::Expiration, expired as u64);
        self.report(CacheEvent::Eviction, evicted as u64);
        metrics::update_cache_entries(len);
        expired + evicted
    }

    /// Stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        metrics::update_cache_entries(0);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.enabled,
            capacity: self.config.capacity,
            entries: self.len(),
            ttl_seconds: self.config.ttl.as_secs(),
        }
    }

    // Called with no lock held
    fn report(&self, event: CacheEvent, count: u64) {
        match &self.analytics {
            Some(analytics) => analytics.record_cache(event, count),
            None => {
                let operation = match event {
                    CacheEvent::Lookup { hit: true } => "hit",
                    CacheEvent::Lookup { hit: false } => "miss",
                    CacheEvent::Insert => "insert",
                    CacheEvent::Eviction => "eviction",
                    CacheEvent::Expiration => "expiration",
                };
                metrics::record_cache_op(operation, count);
            }
        }
    }
}

fn purge_expired(
    entries: &mut LruCache<FingerprintKey, CacheEntry>,
    ttl: std::time::Duration,
    now: Instant,
) -> usize {
    let expired: Vec<FingerprintKey> = entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(ttl, now))
        .map(|(key, _)| key.clone())
        .collect();

    for key in &expired {
        entries.pop(key);
    }
    expired.len()
}

/// Remove the least recently used entry; among entries sharing that
/// last-access instant, the one with the fewest hits.
fn pop_victim(entries: &mut LruCache<FingerprintKey, CacheEntry>) -> Option<CacheEntry> {
    let victim = {
        let mut oldest = entries.iter().rev();
        let (first_key, first) = oldest.next()?;
        let mut victim = (first_key, first.hit_count);

        for (key, entry) in oldest.take_while(|(_, e)| e.last_access == first.last_access) {
            if entry.hit_count < victim.1 {
                victim = (key, entry.hit_count);
            }
        }
        victim.0.clone()
    };

    entries.pop(&victim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TokenUsage;
    use std::time::Duration;

    fn key(n: u32) -> FingerprintKey {
        let request = crate::models::GenerationRequest::titles("Music", "Festival", "Fun")
            .context(format!("edition {}", n))
            .build();
        super::super::fingerprint(&request, Default::default())
    }

    fn entry(key: &FingerprintKey) -> CacheEntry {
        CacheEntry::new(key.clone(), "content", TokenUsage::new(10, 5))
    }

    fn cache(capacity: usize) -> ResponseCache {
        ResponseCache::new(CacheConfig {
            capacity,
            ttl: Duration::from_secs(60),
        })
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = cache(2);
        let (a, b, c) = (key(1), key(2), key(3));
        cache.put(a.clone(), entry(&a));
        cache.put(b.clone(), entry(&b));

        // Touch `a` so `b` becomes least recently used
        assert!(cache.get(&a).is_some());
        cache.put(c.clone(), entry(&c));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = cache(2);
        let (a, b) = (key(1), key(2));
        cache.put(a.clone(), entry(&a));
        cache.put(b.clone(), entry(&b));
        cache.put(a.clone(), CacheEntry::new(a.clone(), "newer", TokenUsage::default()));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&a).unwrap().content, "newer");
        assert!(cache.get(&b).is_some());
    }

    #[test]
    fn test_tie_broken_by_hit_count() {
        let mut entries = LruCache::unbounded();
        let at = Instant::now();
        let (a, b) = (key(1), key(2));

        let mut popular = entry(&a);
        popular.last_access = at;
        popular.hit_count = 5;
        let mut unpopular = entry(&b);
        unpopular.last_access = at;

        // `a` is least recently used in list order but has more hits
        entries.put(a.clone(), popular);
        entries.put(b.clone(), unpopular);

        let victim = pop_victim(&mut entries).unwrap();
        assert_eq!(victim.fingerprint, b);
        assert!(entries.contains(&a));
    }

    #[test]
    fn test_degraded_cache_is_noop() {
        let cache = ResponseCache::new(CacheConfig {
            capacity: 0,
            ttl: Duration::from_secs(60),
        });
        let a = key(1);
        cache.put(a.clone(), entry(&a));

        assert!(!cache.is_enabled());
        assert!(cache.get(&a).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry_is_lazy() {
        let cache = cache(1);
        let (a, b) = (key(1), key(2));
        cache.put(a.clone(), entry(&a));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cache.get(&a).is_none());
        assert_eq!(cache.len(), 1, "expired entry stays until room is needed");

        cache.put(b.clone(), entry(&b));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&b).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_prefers_expired() {
        let cache = cache(3);
        let (a, b) = (key(1), key(2));
        cache.put(a.clone(), entry(&a));
        tokio::time::advance(Duration::from_secs(30)).await;
        cache.put(b.clone(), entry(&b));
        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(cache.evict(), 1);
        assert!(cache.get(&b).is_some());

        // Nothing expired: one LRU entry goes
        assert_eq!(cache.evict(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.evict(), 0);
    }
}
