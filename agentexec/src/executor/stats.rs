//! Executor-wide statistics.
//!
//! Counters are plain atomics updated on the hot path with relaxed ordering
//! and read through [`ExecutorStats`] snapshots for logging.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::cache::CacheStats;

/// Snapshot of executor activity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutorStats {
    /// Calls to `run_agent`.
    pub submissions: u64,
    /// Calls to `reattach`.
    pub reattachments: u64,
    /// Requests that joined an execution already in flight.
    pub coalesced: u64,
    /// Requests answered from the result cache.
    pub cache_hits: u64,
    /// Cache checks that fell through to an execution.
    pub cache_misses: u64,
    pub executions_started: u64,
    pub executions_completed: u64,
    /// Executions cancelled for passing their cancel timeout.
    pub overdue_cancellations: u64,
    /// Executions dropped for passing their maximum timeout.
    pub abandoned_executions: u64,
    /// Requests answered with an empty completion at their deadline.
    pub expired_requests: u64,
    /// The result cache's own counters.
    pub cache: CacheStats,
}

impl ExecutorStats {
    /// Share of requests that needed no execution of their own, between
    /// 0.0 and 1.0.
    pub fn coalescing_ratio(&self) -> f64 {
        let answered = self.coalesced + self.cache_hits + self.executions_started;
        if answered == 0 {
            0.0
        } else {
            (self.coalesced + self.cache_hits) as f64 / answered as f64
        }
    }
}

#[derive(Debug, Default)]
pub(super) struct StatsCounters {
    pub submissions: AtomicU64,
    pub reattachments: AtomicU64,
    pub coalesced: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    pub executions_started: AtomicU64,
    pub executions_completed: AtomicU64,
    pub overdue_cancellations: AtomicU64,
    pub abandoned_executions: AtomicU64,
    pub expired_requests: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self, cache: CacheStats) -> ExecutorStats {
        ExecutorStats {
            submissions: self.submissions.load(Ordering::Relaxed),
            reattachments: self.reattachments.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            executions_started: self.executions_started.load(Ordering::Relaxed),
            executions_completed: self.executions_completed.load(Ordering::Relaxed),
            overdue_cancellations: self.overdue_cancellations.load(Ordering::Relaxed),
            abandoned_executions: self.abandoned_executions.load(Ordering::Relaxed),
            expired_requests: self.expired_requests.load(Ordering::Relaxed),
            cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalescing_ratio() {
        assert_eq!(ExecutorStats::default().coalescing_ratio(), 0.0);

        let stats = ExecutorStats {
            coalesced: 3,
            cache_hits: 1,
            executions_started: 1,
            ..Default::default()
        };
        assert!((stats.coalescing_ratio() - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_snapshot_reads_counters() {
        let counters = StatsCounters::default();
        StatsCounters::bump(&counters.submissions);
        StatsCounters::bump(&counters.submissions);
        StatsCounters::add(&counters.expired_requests, 3);

        let stats = counters.snapshot(CacheStats::default());
        assert_eq!(stats.submissions, 2);
        assert_eq!(stats.expired_requests, 3);
        assert_eq!(stats.coalesced, 0);
    }
}
