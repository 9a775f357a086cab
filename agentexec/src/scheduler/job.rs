//! Job type and related identifiers.
//!
//! A [`Job`] is the unit the scheduler orders and dispatches: an id handed out
//! by the owning scheduler's [`IdSequence`], a mutable [`JobPriority`], a
//! maximum execution duration, and a body that receives the job's
//! cancellation token when it starts.
//!
//! # Example
//!
//! ```ignore
//! let scheduler = PriorityScheduler::new("downloads", SchedulerConfig::default(), handle);
//! let job = Job::new(
//!     scheduler.next_job_id(),
//!     JobPriority::High,
//!     Duration::from_secs(30),
//!     |token| async move {
//!         tokio::select! {
//!             _ = token.cancelled() => {}
//!             _ = fetch() => {}
//!         }
//!     },
//! );
//! scheduler.enqueue(job);
//! ```

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// =============================================================================
// Job identifiers
// =============================================================================

/// Identifier of a job, unique within one scheduler.
///
/// Ids are handed out in increasing order, so comparing two ids of the same
/// scheduler gives their submission order.
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct JobId(u64);

impl JobId {
    /// Returns the numeric value of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobId({})", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Monotonic source of [`JobId`]s.
#[derive(Debug, Default)]
pub struct IdSequence {
    next: AtomicU64,
}

impl IdSequence {
    /// Creates a sequence starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.
    pub fn next_id(&self) -> JobId {
        JobId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

// =============================================================================
// Priority
// =============================================================================

/// Scheduling priority of a job.
///
/// Variants are declared highest first, so the derived ordering sorts the most
/// urgent priority to the front.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum JobPriority {
    /// Dispatched the moment it is enqueued or promoted, even over the
    /// concurrency limit.
    Immediate,
    High,
    #[default]
    Normal,
    Low,
}

impl JobPriority {
    /// All priorities, highest first.
    pub const ALL: [JobPriority; 4] = [
        JobPriority::Immediate,
        JobPriority::High,
        JobPriority::Normal,
        JobPriority::Low,
    ];

    /// Returns true if `self` is strictly more urgent than `other`.
    pub fn is_higher_than(self, other: JobPriority) -> bool {
        self < other
    }

    /// Lowercase name used in configuration files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobPriority::Immediate => "immediate",
            JobPriority::High => "high",
            JobPriority::Normal => "normal",
            JobPriority::Low => "low",
        }
    }
}

impl fmt::Display for JobPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "immediate" => Ok(JobPriority::Immediate),
            "high" => Ok(JobPriority::High),
            "normal" => Ok(JobPriority::Normal),
            "low" => Ok(JobPriority::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

// =============================================================================
// Job
// =============================================================================

/// Boxed job body. Receives the job's cancellation token when dispatched.
pub type JobBody = Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, ()> + Send>;

/// Hook invoked once the job has been handed to the worker pool.
pub type ExecutedHook = Box<dyn FnOnce(JobId) + Send>;

/// A schedulable unit of work.
///
/// Equality and hashing consider only the id.
pub struct Job {
    pub(super) id: JobId,
    pub(super) priority: JobPriority,
    pub(super) max_execution: Duration,
    pub(super) token: CancellationToken,
    pub(super) body: JobBody,
    pub(super) on_executed: Option<ExecutedHook>,
}

impl Job {
    /// Creates a job.
    ///
    /// `max_execution` bounds the wall-clock time between dispatch and the
    /// scheduler interrupting the body.
    pub fn new<F, Fut>(id: JobId, priority: JobPriority, max_execution: Duration, body: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id,
            priority,
            max_execution,
            token: CancellationToken::new(),
            body: Box::new(move |token| Box::pin(body(token))),
            on_executed: None,
        }
    }

    /// Registers a hook called right after the job is dispatched.
    pub fn with_on_executed<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(JobId) + Send + 'static,
    {
        self.on_executed = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn priority(&self) -> JobPriority {
        self.priority
    }

    pub fn max_execution(&self) -> Duration {
        self.max_execution
    }

    /// Returns the token that is cancelled when the job is interrupted.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl std::hash::Hash for Job {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("max_execution", &self.max_execution)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn noop_job(id: u64, priority: JobPriority) -> Job {
        Job::new(JobId::from(id), priority, Duration::from_secs(1), |_| async {})
    }

    #[test]
    fn test_id_sequence_is_monotonic() {
        let ids = IdSequence::new();
        let a = ids.next_id();
        let b = ids.next_id();
        let c = ids.next_id();

        assert!(a < b && b < c);
        assert_eq!(a.as_u64(), 0);
        assert_eq!(c.as_u64(), 2);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(JobPriority::Immediate.is_higher_than(JobPriority::High));
        assert!(JobPriority::High.is_higher_than(JobPriority::Normal));
        assert!(JobPriority::Normal.is_higher_than(JobPriority::Low));
        assert!(!JobPriority::Low.is_higher_than(JobPriority::Low));
        assert_eq!(JobPriority::default(), JobPriority::Normal);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("HIGH".parse::<JobPriority>(), Ok(JobPriority::High));
        assert_eq!(" low ".parse::<JobPriority>(), Ok(JobPriority::Low));
        assert!("urgent".parse::<JobPriority>().is_err());

        for priority in JobPriority::ALL {
            assert_eq!(priority.as_str().parse::<JobPriority>(), Ok(priority));
        }
    }

    #[test]
    fn test_job_equality_by_id_only() {
        let a = noop_job(7, JobPriority::Low);
        let b = noop_job(7, JobPriority::Immediate);
        let c = noop_job(8, JobPriority::Low);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a.id());
        assert!(set.contains(&b.id()));
    }

    #[test]
    fn test_job_id_display() {
        assert_eq!(JobId::from(42).to_string(), "job-42");
        assert_eq!(format!("{:?}", JobId::from(42)), "JobId(42)");
    }
}
