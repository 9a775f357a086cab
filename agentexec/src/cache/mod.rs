//! Result caching for completed agents.
//!
//! Completed agent results are kept in memory, keyed by agent identifier,
//! for as long as the longest-lived reader asked for. See [`ResultCache`]
//! for the read and eviction rules.

mod config;
mod entry;
mod result_cache;
mod stats;

pub use config::{CacheConfig, DEFAULT_CACHE_IDLE_SECS, DEFAULT_CACHE_SWEEP_INTERVAL_MS};
pub use entry::{CachedResult, CachedValue};
pub use result_cache::ResultCache;
pub use stats::CacheStats;
