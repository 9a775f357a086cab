//! Agent request policy.
//!
//! An [`AgentPolicy`] is an immutable snapshot of how one request wants its
//! results: where callbacks are delivered, how long the caller is willing to
//! wait, how old a cached value it accepts, and at which priority the work
//! runs. Policies are built with [`AgentPolicyBuilder`], which enforces:
//!
//! - exactly one delivery mechanism is chosen;
//! - cached values are only used for main-queue delivery (choosing any other
//!   delivery disables the cache);
//! - clearing the cache implies bypassing it.
//!
//! # Example
//!
//! ```
//! use agentexec::policy::AgentPolicyBuilder;
//! use agentexec::scheduler::JobPriority;
//! use std::time::Duration;
//!
//! let policy = AgentPolicyBuilder::new()
//!     .max_cache_age(Duration::from_secs(10))
//!     .priority(JobPriority::High)
//!     .build()
//!     .unwrap();
//!
//! assert!(policy.uses_cache());
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::scheduler::JobPriority;
use crate::serial_queue::MAIN_QUEUE_ID;

// =============================================================================
// Defaults
// =============================================================================

/// Default time a request waits before receiving an empty completion.
pub const DEFAULT_POLICY_TIMEOUT_SECS: u64 = 300;

/// Default oldest cached value a request accepts.
pub const DEFAULT_MAX_CACHE_AGE_SECS: u64 = 120;

/// Default time a parallel callback may run.
pub const DEFAULT_PARALLEL_CALLBACK_TIMEOUT_SECS: u64 = 360;

/// Where completion and progress callbacks are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// The application's main serial queue.
    Main,
    /// The executor's own background serial queue.
    Background,
    /// A named serial queue.
    Queue(String),
    /// Concurrent delivery on the listener scheduler; no ordering across listeners.
    Parallel,
}

impl Delivery {
    /// True if delivery happens on the main queue.
    pub fn is_main(&self) -> bool {
        match self {
            Delivery::Main => true,
            Delivery::Queue(id) => id == MAIN_QUEUE_ID,
            Delivery::Background | Delivery::Parallel => false,
        }
    }
}

/// Errors raised when building a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// More than one delivery mechanism was chosen.
    #[error("a delivery target was already chosen for this policy")]
    ConflictingDelivery,

    /// A named queue was requested with an empty id.
    #[error("delivery queue id must not be empty; use deliver_in_parallel() for pool delivery")]
    EmptyQueueId,

    /// The policy would read cached values for non-main delivery.
    #[error("cached results may only be used for main-queue delivery; bypass the cache")]
    CacheOnBackgroundDelivery,
}

/// Fallback values applied to anything a builder leaves unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDefaults {
    pub delivery: Delivery,
    pub timeout: Duration,
    pub max_cache_age: Duration,
    pub parallel_callback_timeout: Duration,
    pub priority: JobPriority,
}

impl Default for PolicyDefaults {
    fn default() -> Self {
        Self {
            delivery: Delivery::Main,
            timeout: Duration::from_secs(DEFAULT_POLICY_TIMEOUT_SECS),
            max_cache_age: Duration::from_secs(DEFAULT_MAX_CACHE_AGE_SECS),
            parallel_callback_timeout: Duration::from_secs(DEFAULT_PARALLEL_CALLBACK_TIMEOUT_SECS),
            priority: JobPriority::Normal,
        }
    }
}

impl From<&crate::config::PolicySettings> for PolicyDefaults {
    fn from(settings: &crate::config::PolicySettings) -> Self {
        Self {
            delivery: Delivery::Main,
            timeout: Duration::from_secs(settings.timeout_secs),
            max_cache_age: Duration::from_secs(settings.max_cache_age_secs),
            parallel_callback_timeout: Duration::from_secs(settings.parallel_callback_timeout_secs),
            priority: settings.priority,
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Immutable per-request settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPolicy {
    delivery: Delivery,
    timeout: Duration,
    max_cache_age: Duration,
    priority: JobPriority,
    bypass_cache: bool,
    clear_cache: bool,
    parallel_callback_timeout: Duration,
}

impl AgentPolicy {
    /// Starts a builder with the standard defaults.
    pub fn builder() -> AgentPolicyBuilder {
        AgentPolicyBuilder::new()
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Time after submission at which the request receives an empty completion.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Oldest cached value this request accepts; also the lifetime requested
    /// for the value this request's execution produces.
    pub fn max_cache_age(&self) -> Duration {
        self.max_cache_age
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn bypass_cache(&self) -> bool {
        self.bypass_cache
    }

    pub fn clear_cache(&self) -> bool {
        self.clear_cache
    }

    pub fn parallel_callback_timeout(&self) -> Duration {
        self.parallel_callback_timeout
    }

    /// True if a cache check happens before running the agent.
    pub fn uses_cache(&self) -> bool {
        !self.bypass_cache && !self.clear_cache
    }
}

impl Default for AgentPolicy {
    fn default() -> Self {
        let defaults = PolicyDefaults::default();
        Self {
            delivery: defaults.delivery,
            timeout: defaults.timeout,
            max_cache_age: defaults.max_cache_age,
            priority: defaults.priority,
            bypass_cache: false,
            clear_cache: false,
            parallel_callback_timeout: defaults.parallel_callback_timeout,
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`AgentPolicy`].
///
/// Setter mistakes are remembered and reported by [`build`](Self::build), so
/// calls can be chained freely.
#[derive(Debug, Clone)]
pub struct AgentPolicyBuilder {
    defaults: PolicyDefaults,
    delivery: Option<Delivery>,
    timeout: Option<Duration>,
    max_cache_age: Option<Duration>,
    priority: Option<JobPriority>,
    bypass_cache: bool,
    clear_cache: bool,
    parallel_callback_timeout: Option<Duration>,
    error: Option<PolicyError>,
}

impl AgentPolicyBuilder {
    pub fn new() -> Self {
        Self::with_defaults(PolicyDefaults::default())
    }

    /// Starts a builder whose unset values come from `defaults`.
    pub fn with_defaults(defaults: PolicyDefaults) -> Self {
        Self {
            defaults,
            delivery: None,
            timeout: None,
            max_cache_age: None,
            priority: None,
            bypass_cache: false,
            clear_cache: false,
            parallel_callback_timeout: None,
            error: None,
        }
    }

    /// Starts a builder preloaded with every setting of `policy`.
    pub fn build_upon(policy: &AgentPolicy) -> Self {
        let mut builder = Self::new();
        builder.delivery = Some(policy.delivery.clone());
        builder.timeout = Some(policy.timeout);
        builder.max_cache_age = Some(policy.max_cache_age);
        builder.priority = Some(policy.priority);
        builder.bypass_cache = policy.bypass_cache;
        builder.clear_cache = policy.clear_cache;
        builder.parallel_callback_timeout = Some(policy.parallel_callback_timeout);
        builder
    }

    /// Delivers callbacks on the main queue.
    pub fn deliver_on_main(self) -> Self {
        self.set_delivery(Delivery::Main)
    }

    /// Delivers callbacks on the executor's background queue.
    pub fn deliver_on_background(self) -> Self {
        self.set_delivery(Delivery::Background)
    }

    /// Delivers callbacks on a named serial queue.
    pub fn deliver_on_queue(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if id.is_empty() {
            self.error.get_or_insert(PolicyError::EmptyQueueId);
            return self;
        }
        if id == MAIN_QUEUE_ID {
            return self.set_delivery(Delivery::Main);
        }
        self.set_delivery(Delivery::Queue(id))
    }

    /// Delivers callbacks concurrently on the listener scheduler.
    pub fn deliver_in_parallel(self) -> Self {
        self.set_delivery(Delivery::Parallel)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_cache_age(mut self, age: Duration) -> Self {
        self.max_cache_age = Some(age);
        self
    }

    pub fn priority(mut self, priority: JobPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    /// Evicts the cached value before running. Implies bypassing the cache.
    pub fn clear_cache(mut self, clear: bool) -> Self {
        self.clear_cache = clear;
        self
    }

    pub fn parallel_callback_timeout(mut self, timeout: Duration) -> Self {
        self.parallel_callback_timeout = Some(timeout);
        self
    }

    /// Bypasses the cache and requests no caching of the produced value.
    pub fn disable_cache(mut self) -> Self {
        self.bypass_cache = true;
        self.max_cache_age = Some(Duration::ZERO);
        self
    }

    /// Validates and builds the policy.
    pub fn build(self) -> Result<AgentPolicy, PolicyError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let delivery = self.delivery.unwrap_or(self.defaults.delivery);
        let bypass_cache = self.bypass_cache || self.clear_cache;

        if !bypass_cache && !delivery.is_main() {
            return Err(PolicyError::CacheOnBackgroundDelivery);
        }

        Ok(AgentPolicy {
            delivery,
            timeout: self
                .timeout
                .filter(|t| !t.is_zero())
                .unwrap_or(self.defaults.timeout),
            max_cache_age: self.max_cache_age.unwrap_or(self.defaults.max_cache_age),
            priority: self.priority.unwrap_or(self.defaults.priority),
            bypass_cache,
            clear_cache: self.clear_cache,
            parallel_callback_timeout: self
                .parallel_callback_timeout
                .filter(|t| !t.is_zero())
                .unwrap_or(self.defaults.parallel_callback_timeout),
        })
    }

    fn set_delivery(mut self, delivery: Delivery) -> Self {
        if self.delivery.is_some() {
            self.error.get_or_insert(PolicyError::ConflictingDelivery);
            return self;
        }
        if !delivery.is_main() {
            self = self.disable_cache();
        }
        self.delivery = Some(delivery);
        self
    }
}

impl Default for AgentPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}
