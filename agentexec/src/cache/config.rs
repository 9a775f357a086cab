//! Result cache configuration.

use std::time::Duration;

use crate::inactivity::InactivityConfig;

/// Default interval between stale-entry sweeps.
pub const DEFAULT_CACHE_SWEEP_INTERVAL_MS: u64 = 250;

/// Default time without activity before the sweep ticker stops.
pub const DEFAULT_CACHE_IDLE_SECS: u64 = 30;

/// Configuration for a [`ResultCache`](super::ResultCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Interval between stale-entry sweeps.
    pub sweep_interval: Duration,
    /// Time without puts or gets before the sweep ticker stops, once empty.
    pub inactivity_idle: Duration,
}

impl CacheConfig {
    pub(crate) fn inactivity(&self) -> InactivityConfig {
        InactivityConfig::new(self.sweep_interval, self.inactivity_idle)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_millis(DEFAULT_CACHE_SWEEP_INTERVAL_MS),
            inactivity_idle: Duration::from_secs(DEFAULT_CACHE_IDLE_SECS),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            sweep_interval: Duration::from_millis(settings.sweep_interval_ms),
            inactivity_idle: Duration::from_secs(settings.inactivity_idle_secs),
        }
    }
}
