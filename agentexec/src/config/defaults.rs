//! Default values for all configuration settings and the
//! `ConfigFile::default()` implementation.
//!
//! Runtime defaults are owned by the modules that use them and re-exported
//! here so the config file and the runtime types cannot drift apart.

use std::path::PathBuf;

use super::settings::*;
use crate::scheduler::JobPriority;

pub use crate::cache::{DEFAULT_CACHE_IDLE_SECS, DEFAULT_CACHE_SWEEP_INTERVAL_MS};
pub use crate::executor::{DEFAULT_EXECUTOR_CLEANUP_INTERVAL_MS, DEFAULT_EXECUTOR_IDLE_SECS};
pub use crate::policy::{
    DEFAULT_MAX_CACHE_AGE_SECS, DEFAULT_PARALLEL_CALLBACK_TIMEOUT_SECS,
    DEFAULT_POLICY_TIMEOUT_SECS,
};
pub use crate::reaper::DEFAULT_ABANDONED_CACHE_TIMEOUT_MS;
pub use crate::scheduler::{
    DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_HIGH_SPEED_CLEANUP_INTERVAL_MS,
    DEFAULT_HIGH_SPEED_QUEUE_THRESHOLD, DEFAULT_MAX_SIMULTANEOUS_JOBS,
    DEFAULT_SCHEDULER_IDLE_SECS,
};

/// Default priority for requests that do not set one.
pub const DEFAULT_POLICY_PRIORITY: JobPriority = JobPriority::Normal;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "agentexec.log";

/// Default log directory (~/.agentexec/logs).
pub fn default_log_dir() -> PathBuf {
    super::file::config_directory().join("logs")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            executor: ExecutorSettings::default(),
            scheduler: SchedulerSettings::default(),
            cache: CacheSettings::default(),
            policy: PolicySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            inactivity_idle_secs: DEFAULT_EXECUTOR_IDLE_SECS,
            cleanup_interval_ms: DEFAULT_EXECUTOR_CLEANUP_INTERVAL_MS,
            abandoned_cache_timeout_ms: DEFAULT_ABANDONED_CACHE_TIMEOUT_MS,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            max_simultaneous_jobs: DEFAULT_MAX_SIMULTANEOUS_JOBS,
            high_speed_queue_threshold: DEFAULT_HIGH_SPEED_QUEUE_THRESHOLD,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            high_speed_cleanup_interval_ms: DEFAULT_HIGH_SPEED_CLEANUP_INTERVAL_MS,
            inactivity_idle_secs: DEFAULT_SCHEDULER_IDLE_SECS,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            sweep_interval_ms: DEFAULT_CACHE_SWEEP_INTERVAL_MS,
            inactivity_idle_secs: DEFAULT_CACHE_IDLE_SECS,
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_POLICY_TIMEOUT_SECS,
            max_cache_age_secs: DEFAULT_MAX_CACHE_AGE_SECS,
            parallel_callback_timeout_secs: DEFAULT_PARALLEL_CALLBACK_TIMEOUT_SECS,
            priority: DEFAULT_POLICY_PRIORITY,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_dir(),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}
