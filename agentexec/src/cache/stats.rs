//! Result cache statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of cache activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that returned a value.
    pub hits: u64,
    /// Reads that found nothing, or found an entry too old for the reader.
    pub misses: u64,
    /// Values stored.
    pub puts: u64,
    /// Entries removed by the stale sweep.
    pub stale_evictions: u64,
    /// Entries removed explicitly.
    pub removals: u64,
}

impl CacheStats {
    /// Hit rate between 0.0 and 1.0.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct CacheCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub puts: AtomicU64,
    pub stale_evictions: AtomicU64,
    pub removals: AtomicU64,
}

impl CacheCounters {
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            stale_evictions: self.stale_evictions.load(Ordering::Relaxed),
            removals: self.removals.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
    }
}
