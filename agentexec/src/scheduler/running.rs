//! Bookkeeping for dispatched jobs.

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::job::{JobId, JobPriority};

/// A job that has been handed to the worker pool.
///
/// The deadline is fixed at dispatch time (`dispatch + max_execution`).
#[derive(Debug)]
pub struct RunningJob {
    id: JobId,
    priority: JobPriority,
    handle: JoinHandle<()>,
    token: CancellationToken,
    started_at: Instant,
    deadline: Instant,
}

impl RunningJob {
    pub fn new(
        id: JobId,
        priority: JobPriority,
        handle: JoinHandle<()>,
        token: CancellationToken,
        started_at: Instant,
        deadline: Instant,
    ) -> Self {
        Self {
            id,
            priority,
            handle,
            token,
            started_at,
            deadline,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn is_overdue(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Signals cancellation to the body and aborts its task.
    ///
    /// The token lets cooperative bodies observe the interruption; the abort
    /// stops bodies that never check it at their next await point.
    pub fn interrupt(&self) {
        self.token.cancel();
        self.handle.abort();
    }

    pub fn elapsed(&self, now: Instant) -> std::time::Duration {
        now.saturating_duration_since(self.started_at)
    }
}
