//! In-memory result cache with extendable lifetimes.
//!
//! Entries are keyed by agent identifier. A read both serves the caller and
//! votes on how long the entry should live:
//!
//! 1. the entry's stored maximum lifetime is raised to the reader's requested
//!    lifetime if that is longer, unconditionally;
//! 2. only then is hit or miss decided, from the reader's own lifetime.
//!
//! So a read can extend an entry and still miss. A miss never evicts; stale
//! entries are removed by the periodic sweep or by an explicit [`ResultCache::remove`].

use dashmap::DashMap;
use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::config::CacheConfig;
use super::entry::{CachedResult, CachedValue};
use super::stats::{CacheCounters, CacheStats};
use crate::inactivity::{InactivityCleanup, InactivityCleanupListener};

/// Identifier-keyed cache of completed agent results.
///
/// Cloning yields another handle to the same cache.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    entries: DashMap<String, CachedResult>,
    counters: CacheCounters,
    ticker: InactivityCleanup,
}

impl ResultCache {
    /// Creates an empty cache whose sweep ticker runs on `runtime`.
    pub fn new(config: CacheConfig, runtime: Handle) -> Self {
        let inner = Arc::new_cyclic(|me: &Weak<CacheInner>| {
            let listener: Weak<dyn InactivityCleanupListener> = me.clone();
            CacheInner {
                entries: DashMap::new(),
                counters: CacheCounters::default(),
                ticker: InactivityCleanup::new("result-cache", config.inactivity(), listener, runtime),
            }
        });
        Self { inner }
    }

    /// Stores a value. A zero lifetime stores nothing.
    pub fn put(&self, identifier: &str, value: CachedValue, initial_lifetime: Duration) {
        if initial_lifetime.is_zero() {
            trace!(identifier, "Cache put skipped for zero lifetime");
            return;
        }

        self.inner.ticker.restart();
        self.inner
            .entries
            .insert(identifier.to_string(), CachedResult::new(value, initial_lifetime));
        self.inner.counters.puts.fetch_add(1, Ordering::Relaxed);
        debug!(identifier, lifetime_ms = initial_lifetime.as_millis() as u64, "Cached agent result");
    }

    /// Reads a value if it is no older than `requested_lifetime`.
    ///
    /// The entry's maximum lifetime is raised to `requested_lifetime` first,
    /// even when the read misses.
    pub fn get(&self, identifier: &str, requested_lifetime: Duration) -> Option<CachedValue> {
        self.inner.ticker.restart();

        let Some(mut entry) = self.inner.entries.get_mut(identifier) else {
            self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        entry.extend_lifetime(requested_lifetime);

        if entry.is_fresh_for(requested_lifetime, Instant::now()) {
            self.inner.counters.hits.fetch_add(1, Ordering::Relaxed);
            Some(Arc::clone(entry.value().value()))
        } else {
            self.inner.counters.misses.fetch_add(1, Ordering::Relaxed);
            trace!(
                identifier,
                requested_ms = requested_lifetime.as_millis() as u64,
                "Cached result too old for this reader"
            );
            None
        }
    }

    /// Typed read. A value stored under a different type is logged and
    /// reported as a miss.
    pub fn get_typed<R>(&self, identifier: &str, requested_lifetime: Duration) -> Option<Arc<R>>
    where
        R: Any + Send + Sync,
    {
        let value = self.get(identifier, requested_lifetime)?;
        match value.downcast::<R>() {
            Ok(typed) => Some(typed),
            Err(_) => {
                warn!(
                    identifier,
                    expected = std::any::type_name::<R>(),
                    "Cached result has an unexpected type, treating as a miss"
                );
                None
            }
        }
    }

    /// Removes an entry. Returns true if one existed.
    pub fn remove(&self, identifier: &str) -> bool {
        let removed = self.inner.entries.remove(identifier).is_some();
        if removed {
            self.inner.counters.removals.fetch_add(1, Ordering::Relaxed);
            debug!(identifier, "Removed cached result");
        }
        removed
    }

    /// Removes every entry older than its maximum lifetime.
    ///
    /// Returns the number of evicted entries.
    pub fn clean_stale(&self) -> usize {
        self.inner.clean_stale()
    }

    /// Current maximum lifetime of an entry.
    pub fn max_lifetime(&self, identifier: &str) -> Option<Duration> {
        self.inner
            .entries
            .get(identifier)
            .map(|entry| entry.max_lifetime())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.inner.entries.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.counters.snapshot()
    }
}

impl CacheInner {
    fn clean_stale(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|identifier, entry| {
            let stale = entry.is_stale(now);
            if stale {
                debug!(
                    identifier = %identifier,
                    age_ms = entry.age(now).as_millis() as u64,
                    "Evicting stale cached result"
                );
            }
            !stale
        });
        let evicted = before.saturating_sub(self.entries.len());
        self.counters
            .stale_evictions
            .fetch_add(evicted as u64, Ordering::Relaxed);
        evicted
    }
}

impl InactivityCleanupListener for CacheInner {
    fn perform_cleanup(&self) {
        self.clean_stale();
    }

    fn is_busy(&self) -> bool {
        !self.entries.is_empty()
    }

    fn enter_idle_state(&self) {
        trace!("Result cache sweep idle");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Cache whose background sweep never fires during a test.
    fn cache() -> ResultCache {
        let config = CacheConfig {
            sweep_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        ResultCache::new(config, Handle::current())
    }

    fn value(v: &'static str) -> CachedValue {
        Arc::new(v.to_string())
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_returns_stored_value() {
        let cache = cache();
        let stored = value("alpha");
        cache.put("a", Arc::clone(&stored), Duration::from_secs(10));

        let hit = cache.get("a", Duration::from_secs(10)).unwrap();
        assert!(Arc::ptr_eq(&hit, &stored));
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_and_get() {
        let cache = cache();
        cache.put("a", value("alpha"), Duration::from_secs(10));

        let hit = cache.get_typed::<String>("a", Duration::from_secs(10));
        assert_eq!(hit.as_deref().map(String::as_str), Some("alpha"));
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_lifetime_put_is_noop() {
        let cache = cache();
        cache.put("a", value("alpha"), Duration::ZERO);

        assert!(cache.is_empty());
        assert!(cache.get("a", Duration::from_secs(10)).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_absent_is_miss() {
        let cache = cache();
        assert!(cache.get("missing", Duration::from_secs(1)).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_by_age_does_not_evict() {
        let cache = cache();
        cache.put("a", value("alpha"), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(3)).await;

        assert!(cache.get("a", Duration::from_secs(2)).is_none());
        assert!(cache.contains("a"));
        assert!(cache.get("a", Duration::from_secs(5)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_miss_still_extends_lifetime() {
        let cache = cache();
        cache.put("a", value("alpha"), Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(3)).await;

        // Too old for a 2s reader, but the 2s horizon is recorded anyway.
        assert!(cache.get("a", Duration::from_secs(2)).is_none());
        assert_eq!(cache.max_lifetime("a"), Some(Duration::from_secs(2)));
        assert!(cache.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_reader_keeps_entry_alive() {
        let cache = cache();
        cache.put("a", value("alpha"), Duration::from_secs(1));
        tokio::time::advance(Duration::from_millis(500)).await;

        assert!(cache.get("a", Duration::from_secs(60)).is_some());
        assert_eq!(cache.max_lifetime("a"), Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.clean_stale(), 0);
        assert!(cache.get("a", Duration::from_secs(1)).is_none());
        assert!(cache.get("a", Duration::from_secs(10)).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_reader_does_not_shorten_lifetime() {
        let cache = cache();
        cache.put("a", value("alpha"), Duration::from_secs(30));

        assert!(cache.get("a", Duration::from_secs(1)).is_some());
        assert_eq!(cache.max_lifetime("a"), Some(Duration::from_secs(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clean_stale_removes_only_expired() {
        let cache = cache();
        cache.put("short", value("s"), Duration::from_secs(1));
        cache.put("long", value("l"), Duration::from_secs(60));
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.clean_stale(), 1);
        assert!(!cache.contains("short"));
        assert!(cache.contains("long"));
        assert_eq!(cache.stats().stale_evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_ticker_evicts_in_background() {
        let cache = ResultCache::new(CacheConfig::default(), Handle::current());
        cache.put("a", value("alpha"), Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert!(!cache.contains("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_typed_get_mismatch_is_miss() {
        let cache = cache();
        cache.put("a", Arc::new(7u64), Duration::from_secs(10));

        assert!(cache.get_typed::<String>("a", Duration::from_secs(10)).is_none());
        assert_eq!(
            cache.get_typed::<u64>("a", Duration::from_secs(10)).as_deref(),
            Some(&7)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove() {
        let cache = cache();
        cache.put("a", value("alpha"), Duration::from_secs(10));

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.stats().removals, 1);
    }
}
