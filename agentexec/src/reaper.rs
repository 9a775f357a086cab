//! Abandoned-cache reaper.
//!
//! Ties the lifetime of a cached result to the set of callers still holding
//! a tether for its identifier. Interest is reference counted: every live
//! tether registers its [`TetherId`] and removes it on release or drop.
//!
//! On each sweep:
//!
//! 1. identifiers whose abandon deadline has passed lose their cache entry;
//! 2. identifiers with no remaining interest stop being tracked and get an
//!    abandon deadline of `now + abandoned_cache_timeout`.
//!
//! A tether registered for the identifier before the deadline cancels it.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::ResultCache;

/// Default grace period between losing the last tether and eviction.
pub const DEFAULT_ABANDONED_CACHE_TIMEOUT_MS: u64 = 500;

/// Identifier of one tether's registration.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TetherId(u64);

impl From<u64> for TetherId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TetherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tether-{}", self.0)
    }
}

/// Outcome of one reaper sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapOutcome {
    /// Identifiers whose cache entry was evicted.
    pub evicted: Vec<String>,
    /// Identifiers that lost their last tether and now have a deadline.
    pub armed: Vec<String>,
}

#[derive(Default)]
struct ReaperState {
    interest: HashMap<String, HashSet<TetherId>>,
    deadlines: HashMap<String, Instant>,
}

/// Tracks tether interest per identifier and evicts abandoned cache entries.
pub struct AbandonedCacheReaper {
    timeout: Duration,
    state: Mutex<ReaperState>,
}

impl AbandonedCacheReaper {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: Mutex::new(ReaperState::default()),
        }
    }

    /// Records interest and cancels any pending eviction for `identifier`.
    pub fn add_tether(&self, identifier: &str, tether: TetherId) {
        let mut state = self.state.lock();
        state
            .interest
            .entry(identifier.to_string())
            .or_default()
            .insert(tether);
        if state.deadlines.remove(identifier).is_some() {
            debug!(identifier, %tether, "Abandon deadline cancelled by new tether");
        }
    }

    /// Drops interest. Removing an unknown tether does nothing.
    pub fn remove_tether(&self, identifier: &str, tether: TetherId) {
        let mut state = self.state.lock();
        if let Some(tethers) = state.interest.get_mut(identifier) {
            tethers.remove(&tether);
        }
    }

    /// Runs one sweep against `cache`.
    pub fn sweep(&self, cache: &ResultCache) -> ReapOutcome {
        let now = Instant::now();
        let mut outcome = ReapOutcome::default();

        let mut state = self.state.lock();

        state.deadlines.retain(|identifier, deadline| {
            if now >= *deadline {
                outcome.evicted.push(identifier.clone());
                false
            } else {
                true
            }
        });

        let deadline = now + self.timeout;
        let ReaperState {
            interest,
            deadlines,
        } = &mut *state;
        interest.retain(|identifier, tethers| {
            if tethers.is_empty() {
                deadlines.insert(identifier.clone(), deadline);
                outcome.armed.push(identifier.clone());
                false
            } else {
                true
            }
        });
        drop(state);

        for identifier in &outcome.evicted {
            cache.remove(identifier);
            debug!(identifier = %identifier, "Evicted abandoned cached result");
        }

        outcome
    }

    /// True while any eviction is pending.
    pub fn has_pending_deadlines(&self) -> bool {
        !self.state.lock().deadlines.is_empty()
    }

    /// Pending eviction deadline for an identifier.
    pub fn deadline(&self, identifier: &str) -> Option<Instant> {
        self.state.lock().deadlines.get(identifier).copied()
    }

    /// Number of live tethers registered for an identifier.
    pub fn interest_count(&self, identifier: &str) -> usize {
        self.state
            .lock()
            .interest
            .get(identifier)
            .map_or(0, HashSet::len)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for AbandonedCacheReaper {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_ABANDONED_CACHE_TIMEOUT_MS))
    }
}
