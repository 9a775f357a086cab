//! Record of one in-flight execution.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::agent::{AgentControl, AgentTimeouts};
use crate::scheduler::{JobId, JobPriority};

#[derive(Debug, Clone, Copy)]
struct Deadlines {
    cancel: Instant,
    maximum: Instant,
}

/// The executor's view of a running agent.
///
/// Deadlines are unset until the agent's job actually starts; an agent still
/// waiting in the scheduler queue cannot time out.
pub(super) struct StartedAgent {
    job_id: JobId,
    control: Arc<dyn AgentControl>,
    token: CancellationToken,
    timeouts: AgentTimeouts,
    priority: JobPriority,
    cache_lifetime: Duration,
    cancelled: bool,
    deadlines: Option<Deadlines>,
}

impl StartedAgent {
    pub fn new(
        job_id: JobId,
        control: Arc<dyn AgentControl>,
        token: CancellationToken,
        timeouts: AgentTimeouts,
        priority: JobPriority,
        cache_lifetime: Duration,
    ) -> Self {
        Self {
            job_id,
            control,
            token,
            timeouts,
            priority,
            cache_lifetime,
            cancelled: false,
            deadlines: None,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn control(&self) -> Arc<dyn AgentControl> {
        Arc::clone(&self.control)
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    /// Raises the priority. Returns true if it changed.
    pub fn escalate(&mut self, priority: JobPriority) -> bool {
        if priority.is_higher_than(self.priority) {
            self.priority = priority;
            true
        } else {
            false
        }
    }

    /// Lifetime the result will be cached with: the longest max cache age of
    /// every request that joined this execution.
    pub fn cache_lifetime(&self) -> Duration {
        self.cache_lifetime
    }

    pub fn raise_cache_lifetime(&mut self, lifetime: Duration) {
        self.cache_lifetime = self.cache_lifetime.max(lifetime);
    }

    /// Starts the cancel and maximum clocks.
    pub fn mark_started(&mut self, now: Instant) {
        self.deadlines = Some(Deadlines {
            cancel: now + self.timeouts.cancel,
            maximum: now + self.timeouts.maximum,
        });
    }

    pub fn is_past_cancel_deadline(&self, now: Instant) -> bool {
        self.deadlines.is_some_and(|d| now >= d.cancel)
    }

    pub fn is_past_maximum_deadline(&self, now: Instant) -> bool {
        self.deadlines.is_some_and(|d| now >= d.maximum)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Marks the execution cancelled and cancels its token.
    ///
    /// Returns the agent handle the first time so the caller can invoke
    /// [`AgentControl::cancel`] outside any lock; `None` afterwards.
    pub fn cancel(&mut self) -> Option<Arc<dyn AgentControl>> {
        if self.cancelled {
            return None;
        }
        self.cancelled = true;
        self.token.cancel();
        Some(self.control())
    }
}

impl std::fmt::Debug for StartedAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartedAgent")
            .field("job_id", &self.job_id)
            .field("priority", &self.priority)
            .field("cache_lifetime", &self.cache_lifetime)
            .field("cancelled", &self.cancelled)
            .field("started", &self.deadlines.is_some())
            .finish_non_exhaustive()
    }
}
