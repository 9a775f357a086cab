//! Scheduler configuration.
//!
//! This module contains the [`SchedulerConfig`] struct and the constants
//! describing the default concurrency limit and tick speeds.

use std::time::Duration;

use crate::inactivity::InactivityConfig;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default maximum number of jobs running at the same time.
pub const DEFAULT_MAX_SIMULTANEOUS_JOBS: usize = 10;

/// Queue length above which the cleanup tick switches to high-speed mode.
pub const DEFAULT_HIGH_SPEED_QUEUE_THRESHOLD: usize = 20;

/// Default cleanup tick interval.
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 100;

/// Cleanup tick interval used while the queue is long.
pub const DEFAULT_HIGH_SPEED_CLEANUP_INTERVAL_MS: u64 = 5;

/// Idle time after which the worker pool is torn down.
pub const DEFAULT_SCHEDULER_IDLE_SECS: u64 = 120;

// =============================================================================
// Scheduler Configuration
// =============================================================================

/// Configuration for a [`PriorityScheduler`](super::PriorityScheduler).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Jobs dispatched concurrently before the queue starts holding work.
    ///
    /// `Immediate` jobs ignore this limit but still count toward it.
    pub max_simultaneous_jobs: usize,

    /// Queue length that switches the cleanup tick to high-speed mode.
    pub high_speed_queue_threshold: usize,

    /// Cleanup tick interval in normal mode.
    pub cleanup_interval: Duration,

    /// Cleanup tick interval in high-speed mode.
    pub high_speed_cleanup_interval: Duration,

    /// How long the scheduler must be idle before its pool is torn down.
    pub inactivity_idle: Duration,
}

impl SchedulerConfig {
    /// Sets the concurrency limit.
    pub fn with_max_simultaneous_jobs(mut self, max: usize) -> Self {
        self.max_simultaneous_jobs = max.max(1);
        self
    }

    /// Sets the high-speed queue threshold.
    pub fn with_high_speed_queue_threshold(mut self, threshold: usize) -> Self {
        self.high_speed_queue_threshold = threshold;
        self
    }

    /// Sets the normal cleanup tick interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Sets the idle time before the pool is torn down.
    pub fn with_inactivity_idle(mut self, idle: Duration) -> Self {
        self.inactivity_idle = idle;
        self
    }

    /// Returns the ticker configuration derived from this scheduler config.
    pub(crate) fn inactivity(&self) -> InactivityConfig {
        InactivityConfig {
            interval: self.cleanup_interval,
            high_speed_interval: self.high_speed_cleanup_interval,
            idle_after: self.inactivity_idle,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_simultaneous_jobs: DEFAULT_MAX_SIMULTANEOUS_JOBS,
            high_speed_queue_threshold: DEFAULT_HIGH_SPEED_QUEUE_THRESHOLD,
            cleanup_interval: Duration::from_millis(DEFAULT_CLEANUP_INTERVAL_MS),
            high_speed_cleanup_interval: Duration::from_millis(
                DEFAULT_HIGH_SPEED_CLEANUP_INTERVAL_MS,
            ),
            inactivity_idle: Duration::from_secs(DEFAULT_SCHEDULER_IDLE_SECS),
        }
    }
}

impl From<&crate::config::SchedulerSettings> for SchedulerConfig {
    fn from(settings: &crate::config::SchedulerSettings) -> Self {
        Self {
            max_simultaneous_jobs: settings.max_simultaneous_jobs.max(1),
            high_speed_queue_threshold: settings.high_speed_queue_threshold,
            cleanup_interval: Duration::from_millis(settings.cleanup_interval_ms),
            high_speed_cleanup_interval: Duration::from_millis(
                settings.high_speed_cleanup_interval_ms,
            ),
            inactivity_idle: Duration::from_secs(settings.inactivity_idle_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.max_simultaneous_jobs, DEFAULT_MAX_SIMULTANEOUS_JOBS);
        assert_eq!(
            config.high_speed_queue_threshold,
            DEFAULT_HIGH_SPEED_QUEUE_THRESHOLD
        );
        assert_eq!(config.cleanup_interval, Duration::from_millis(100));
        assert_eq!(config.high_speed_cleanup_interval, Duration::from_millis(5));
        assert_eq!(config.inactivity_idle, Duration::from_secs(120));
    }

    #[test]
    fn test_max_simultaneous_jobs_never_zero() {
        let config = SchedulerConfig::default().with_max_simultaneous_jobs(0);
        assert_eq!(config.max_simultaneous_jobs, 1);
    }

    #[test]
    fn test_from_settings() {
        let settings = crate::config::SchedulerSettings {
            max_simultaneous_jobs: 4,
            high_speed_queue_threshold: 8,
            cleanup_interval_ms: 50,
            high_speed_cleanup_interval_ms: 2,
            inactivity_idle_secs: 30,
        };

        let config = SchedulerConfig::from(&settings);
        assert_eq!(config.max_simultaneous_jobs, 4);
        assert_eq!(config.high_speed_queue_threshold, 8);
        assert_eq!(config.cleanup_interval, Duration::from_millis(50));
        assert_eq!(config.high_speed_cleanup_interval, Duration::from_millis(2));
        assert_eq!(config.inactivity_idle, Duration::from_secs(30));
    }
}
