//! Cached agent result entry.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Type-erased value shared between the cache and every listener.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// A completed agent result with its creation time and eviction horizon.
///
/// `max_lifetime` is the longest lifetime any reader has asked for. It only
/// ever grows, and the stale sweep evicts against it; each reader decides
/// hit or miss against its own requested lifetime instead.
#[derive(Clone)]
pub struct CachedResult {
    value: CachedValue,
    created_at: Instant,
    max_lifetime: Duration,
}

impl CachedResult {
    pub fn new(value: CachedValue, max_lifetime: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            max_lifetime,
        }
    }

    pub fn value(&self) -> &CachedValue {
        &self.value
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn max_lifetime(&self) -> Duration {
        self.max_lifetime
    }

    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Raises the eviction horizon to `lifetime` if it is longer.
    pub fn extend_lifetime(&mut self, lifetime: Duration) {
        self.max_lifetime = self.max_lifetime.max(lifetime);
    }

    /// True if the entry is young enough for a reader asking for `lifetime`.
    pub fn is_fresh_for(&self, lifetime: Duration, now: Instant) -> bool {
        self.age(now) <= lifetime
    }

    /// True once the entry has outlived every lifetime ever requested.
    pub fn is_stale(&self, now: Instant) -> bool {
        self.age(now) > self.max_lifetime
    }
}

impl std::fmt::Debug for CachedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedResult")
            .field("created_at", &self.created_at)
            .field("max_lifetime", &self.max_lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lifetime_only_grows() {
        let mut entry = CachedResult::new(Arc::new(1u32), Duration::from_secs(10));

        entry.extend_lifetime(Duration::from_secs(5));
        assert_eq!(entry.max_lifetime(), Duration::from_secs(10));

        entry.extend_lifetime(Duration::from_secs(30));
        assert_eq!(entry.max_lifetime(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_and_stale() {
        let entry = CachedResult::new(Arc::new("v"), Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(6)).await;
        let now = Instant::now();

        assert!(entry.is_fresh_for(Duration::from_secs(6), now));
        assert!(!entry.is_fresh_for(Duration::from_secs(5), now));
        assert!(!entry.is_stale(now));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(entry.is_stale(Instant::now()));
    }
}
