//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use crate::scheduler::JobPriority;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Executor housekeeping
    pub executor: ExecutorSettings,
    /// Agent job scheduler
    pub scheduler: SchedulerSettings,
    /// Result cache
    pub cache: CacheSettings,
    /// Request policy defaults
    pub policy: PolicySettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// `[executor]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Seconds without work before the cleanup ticker stops
    pub inactivity_idle_secs: u64,
    /// Interval between deadline checks, in milliseconds
    pub cleanup_interval_ms: u64,
    /// How long a result stays cached after its last tether is gone
    pub abandoned_cache_timeout_ms: u64,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub max_simultaneous_jobs: usize,
    /// Queue length above which the high-speed cleanup interval is used
    pub high_speed_queue_threshold: usize,
    pub cleanup_interval_ms: u64,
    pub high_speed_cleanup_interval_ms: u64,
    pub inactivity_idle_secs: u64,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub sweep_interval_ms: u64,
    pub inactivity_idle_secs: u64,
}

/// `[policy]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    pub timeout_secs: u64,
    pub max_cache_age_secs: u64,
    pub parallel_callback_timeout_secs: u64,
    pub priority: JobPriority,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log directory; empty in the file means the default
    pub directory: PathBuf,
    /// Log file name inside `directory`
    pub file: String,
}
