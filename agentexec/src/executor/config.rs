//! Executor configuration.
//!
//! This module contains the [`ExecutorConfig`] struct and related constants
//! for configuring an [`AgentExecutor`](super::AgentExecutor) and the
//! schedulers and cache it owns.

use std::time::Duration;

use crate::cache::CacheConfig;
use crate::inactivity::InactivityConfig;
use crate::policy::PolicyDefaults;
use crate::reaper::DEFAULT_ABANDONED_CACHE_TIMEOUT_MS;
use crate::scheduler::SchedulerConfig;

// =============================================================================
// Configuration Constants
// =============================================================================

/// Default interval of the executor's own cleanup tick.
pub const DEFAULT_EXECUTOR_CLEANUP_INTERVAL_MS: u64 = 250;

/// Default time without activity before the executor's ticker goes idle.
pub const DEFAULT_EXECUTOR_IDLE_SECS: u64 = 120;

// =============================================================================
// Executor Configuration
// =============================================================================

/// Configuration for an agent executor.
#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    /// Interval between expiry/reaping passes.
    pub cleanup_interval: Duration,

    /// Idle time after which the executor stops ticking and closes its
    /// background delivery queue.
    pub inactivity_idle: Duration,

    /// Grace period between a result losing its last tether and eviction.
    pub abandoned_cache_timeout: Duration,

    /// Used for the agent, cache-check and parallel-listener schedulers.
    pub scheduler: SchedulerConfig,

    pub cache: CacheConfig,

    /// Values used by `run_agent_with_default_policy`.
    pub policy: PolicyDefaults,
}

impl ExecutorConfig {
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn with_inactivity_idle(mut self, idle: Duration) -> Self {
        self.inactivity_idle = idle;
        self
    }

    pub fn with_abandoned_cache_timeout(mut self, timeout: Duration) -> Self {
        self.abandoned_cache_timeout = timeout;
        self
    }

    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_policy_defaults(mut self, policy: PolicyDefaults) -> Self {
        self.policy = policy;
        self
    }

    pub(crate) fn inactivity(&self) -> InactivityConfig {
        InactivityConfig::new(self.cleanup_interval, self.inactivity_idle)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_millis(DEFAULT_EXECUTOR_CLEANUP_INTERVAL_MS),
            inactivity_idle: Duration::from_secs(DEFAULT_EXECUTOR_IDLE_SECS),
            abandoned_cache_timeout: Duration::from_millis(DEFAULT_ABANDONED_CACHE_TIMEOUT_MS),
            scheduler: SchedulerConfig::default(),
            cache: CacheConfig::default(),
            policy: PolicyDefaults::default(),
        }
    }
}

impl From<&crate::config::ConfigFile> for ExecutorConfig {
    fn from(config: &crate::config::ConfigFile) -> Self {
        let executor = &config.executor;
        Self {
            cleanup_interval: Duration::from_millis(executor.cleanup_interval_ms),
            inactivity_idle: Duration::from_secs(executor.inactivity_idle_secs),
            abandoned_cache_timeout: Duration::from_millis(executor.abandoned_cache_timeout_ms),
            scheduler: SchedulerConfig::from(&config.scheduler),
            cache: CacheConfig::from(&config.cache),
            policy: PolicyDefaults::from(&config.policy),
        }
    }
}
