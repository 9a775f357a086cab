//! Priority-ordered job scheduling.
//!
//! The scheduler is the lowest layer of the executor. It knows nothing about
//! agents, caching or listeners; it runs [`Job`]s in `(priority, id)` order
//! on a bounded number of concurrent tasks and interrupts jobs that overrun.
//!
//! - [`job`]: [`Job`], [`JobId`], [`JobPriority`], [`IdSequence`]
//! - [`queue`]: the ordered wait queue
//! - [`running`]: bookkeeping for dispatched jobs
//! - [`pool`]: the lazily created worker pool
//! - [`service`]: [`PriorityScheduler`], tying the pieces together

mod config;
mod job;
mod pool;
mod queue;
mod running;
mod service;

pub use config::{
    SchedulerConfig, DEFAULT_CLEANUP_INTERVAL_MS, DEFAULT_HIGH_SPEED_CLEANUP_INTERVAL_MS,
    DEFAULT_HIGH_SPEED_QUEUE_THRESHOLD, DEFAULT_MAX_SIMULTANEOUS_JOBS, DEFAULT_SCHEDULER_IDLE_SECS,
};
pub use job::{ExecutedHook, IdSequence, Job, JobBody, JobId, JobPriority};
pub use pool::WorkerPool;
pub use queue::PriorityQueue;
pub use running::RunningJob;
pub use service::PriorityScheduler;
