//! Priority scheduler over a lazily created worker pool.
//!
//! # Architecture
//!
//! ```text
//! enqueue(job) ──► Immediate? ──yes──────────────────┐
//!                     │ no                           ▼
//!                     ▼                       ┌─────────────┐
//!              PriorityQueue ──drain while──► │ WorkerPool  │
//!              (priority, id)   running < max └──────┬──────┘
//!                     ▲                              │ finished / overdue
//!                     │                              ▼
//!              cleanup tick ◄──── InactivityCleanup ticker
//!              (fast when queue is long)
//! ```
//!
//! The scheduler owns no business logic. It orders jobs, bounds how many run
//! at once, interrupts jobs that outlive their maximum execution duration and
//! adapts its tick speed to the queue length.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::config::SchedulerConfig;
use super::job::{ExecutedHook, IdSequence, Job, JobId, JobPriority};
use super::pool::WorkerPool;
use super::queue::PriorityQueue;
use super::running::RunningJob;
use crate::inactivity::{InactivityCleanup, InactivityCleanupListener};

/// Bounded-concurrency, priority-ordered job scheduler.
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct PriorityScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    name: String,
    config: SchedulerConfig,
    ids: IdSequence,
    state: Mutex<SchedulerState>,
    pool: WorkerPool,
    ticker: InactivityCleanup,
    me: Weak<SchedulerInner>,
}

#[derive(Default)]
struct SchedulerState {
    queue: PriorityQueue,
    running: HashMap<JobId, RunningJob>,
}

/// Hooks collected under the state lock and run after it is released.
type PendingHooks = Vec<(JobId, ExecutedHook)>;

impl PriorityScheduler {
    /// Creates a scheduler that spawns its work on `runtime`.
    pub fn new(name: impl Into<String>, config: SchedulerConfig, runtime: Handle) -> Self {
        let name = name.into();
        let inner = Arc::new_cyclic(|me: &Weak<SchedulerInner>| {
            let listener: Weak<dyn InactivityCleanupListener> = me.clone();
            SchedulerInner {
                ticker: InactivityCleanup::new(
                    format!("{}-scheduler", name),
                    config.inactivity(),
                    listener,
                    runtime.clone(),
                ),
                pool: WorkerPool::new(name.clone(), runtime),
                name,
                config,
                ids: IdSequence::new(),
                state: Mutex::new(SchedulerState::default()),
                me: me.clone(),
            }
        });
        Self { inner }
    }

    /// Hands out the next job id for this scheduler.
    pub fn next_job_id(&self) -> JobId {
        self.inner.ids.next_id()
    }

    /// Enqueues a single job.
    pub fn enqueue(&self, job: Job) {
        self.enqueue_all(std::iter::once(job));
    }

    /// Enqueues jobs. `Immediate` jobs are dispatched right away; the rest
    /// wait in the queue until a slot frees up.
    pub fn enqueue_all(&self, jobs: impl IntoIterator<Item = Job>) {
        let hooks = {
            let mut state = self.inner.state.lock();
            let mut hooks = PendingHooks::new();
            for job in jobs {
                trace!(scheduler = %self.inner.name, job = %job.id, priority = %job.priority, "Job enqueued");
                if job.priority == JobPriority::Immediate {
                    self.inner.dispatch(&mut state, job, &mut hooks);
                } else {
                    state.queue.push(job);
                }
            }
            self.inner.process_queue(&mut state, &mut hooks);
            hooks
        };
        run_hooks(hooks);
        self.inner.ticker.restart();
    }

    /// Changes the priority of a job that has not been dispatched yet.
    ///
    /// Running or unknown jobs are left alone. A queued job raised to
    /// `Immediate` is dispatched at once. Returns true if the job was queued.
    pub fn update_priority(&self, id: JobId, priority: JobPriority) -> bool {
        let (updated, hooks) = {
            let mut state = self.inner.state.lock();
            let mut hooks = PendingHooks::new();
            if state.running.contains_key(&id) || !state.queue.contains(id) {
                return false;
            }

            if priority == JobPriority::Immediate {
                if let Some(mut job) = state.queue.remove(id) {
                    job.priority = priority;
                    self.inner.dispatch(&mut state, job, &mut hooks);
                }
            } else {
                state.queue.reprioritize(id, priority);
            }
            self.inner.process_queue(&mut state, &mut hooks);
            (true, hooks)
        };
        debug!(scheduler = %self.inner.name, job = %id, priority = %priority, "Job priority updated");
        run_hooks(hooks);
        updated
    }

    /// Returns true while any dispatched job has not finished.
    pub fn has_running_jobs(&self) -> bool {
        !self.inner.state.lock().running.is_empty()
    }

    /// Returns true when nothing is queued or running.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        state.running.is_empty() && state.queue.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.inner.state.lock().running.len()
    }

    pub fn queued_count(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Returns true if the job is waiting in the queue.
    pub fn is_queued(&self, id: JobId) -> bool {
        self.inner.state.lock().queue.contains(id)
    }

    /// Returns true if the job has been dispatched and is still tracked.
    pub fn is_running(&self, id: JobId) -> bool {
        self.inner.state.lock().running.contains_key(&id)
    }

    /// Returns true while the cleanup ticker uses its fast interval.
    pub fn is_high_speed(&self) -> bool {
        self.inner.ticker.is_high_speed()
    }

    /// Returns true while a worker pool exists.
    pub fn has_worker_pool(&self) -> bool {
        self.inner.pool.is_active()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Runs one cleanup pass immediately.
    pub fn perform_cleanup(&self) {
        self.inner.perform_cleanup();
    }
}

impl SchedulerInner {
    /// Dispatches a job to the pool and records it as running.
    fn dispatch(&self, state: &mut SchedulerState, job: Job, hooks: &mut PendingHooks) {
        let Job {
            id,
            priority,
            max_execution,
            token,
            body,
            on_executed,
        } = job;

        let me = self.me.clone();
        let body_token = token.clone();
        let handle = self.pool.spawn(async move {
            body(body_token).await;
            if let Some(inner) = me.upgrade() {
                inner.on_job_finished(id);
            }
        });

        let now = Instant::now();
        state.running.insert(
            id,
            RunningJob::new(id, priority, handle, token, now, now + max_execution),
        );
        trace!(scheduler = %self.name, job = %id, running = state.running.len(), "Job dispatched");

        if let Some(hook) = on_executed {
            hooks.push((id, hook));
        }
    }

    /// Dispatches queued jobs while there is a free slot, then adapts tick speed.
    fn process_queue(&self, state: &mut SchedulerState, hooks: &mut PendingHooks) {
        while state.running.len() < self.config.max_simultaneous_jobs {
            let Some(job) = state.queue.pop() else {
                break;
            };
            self.dispatch(state, job, hooks);
        }

        let queued = state.queue.len();
        if queued > self.config.high_speed_queue_threshold {
            self.ticker.set_high_speed(true);
        } else if queued < self.config.high_speed_queue_threshold {
            self.ticker.set_high_speed(false);
        }
    }

    fn on_job_finished(&self, id: JobId) {
        let hooks = {
            let mut state = self.state.lock();
            let mut hooks = PendingHooks::new();
            if state.running.remove(&id).is_some() {
                trace!(scheduler = %self.name, job = %id, "Job finished");
            }
            self.process_queue(&mut state, &mut hooks);
            hooks
        };
        run_hooks(hooks);
    }
}

impl InactivityCleanupListener for SchedulerInner {
    fn perform_cleanup(&self) {
        let hooks = {
            let mut state = self.state.lock();
            let mut hooks = PendingHooks::new();
            let now = Instant::now();

            state.running.retain(|id, job| {
                if job.is_finished() {
                    return false;
                }
                if job.is_overdue(now) {
                    warn!(
                        scheduler = %self.name,
                        job = %id,
                        priority = %job.priority(),
                        elapsed_ms = job.elapsed(now).as_millis() as u64,
                        "Job exceeded its maximum execution time, interrupting"
                    );
                    job.interrupt();
                    return false;
                }
                true
            });

            self.process_queue(&mut state, &mut hooks);
            hooks
        };
        run_hooks(hooks);
    }

    fn is_busy(&self) -> bool {
        let state = self.state.lock();
        !state.running.is_empty() || !state.queue.is_empty()
    }

    fn enter_idle_state(&self) {
        self.pool.shutdown();
    }
}

fn run_hooks(hooks: PendingHooks) {
    for (id, hook) in hooks {
        hook(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::{mpsc, Notify};

    fn scheduler(max: usize) -> PriorityScheduler {
        let config = SchedulerConfig::default()
            .with_max_simultaneous_jobs(max)
            .with_high_speed_queue_threshold(3)
            .with_inactivity_idle(Duration::from_secs(1));
        PriorityScheduler::new("test", config, Handle::current())
    }

    /// Job that records its id on start and then waits for `gate`.
    fn gated_job(
        scheduler: &PriorityScheduler,
        priority: JobPriority,
        started: mpsc::UnboundedSender<JobId>,
        gate: Arc<Notify>,
    ) -> Job {
        let id = scheduler.next_job_id();
        Job::new(id, priority, Duration::from_secs(60), move |_| async move {
            let _ = started.send(id);
            gate.notified().await;
        })
    }

    #[tokio::test]
    async fn test_runs_enqueued_job() {
        let scheduler = scheduler(2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = scheduler.next_job_id();
        scheduler.enqueue(Job::new(id, JobPriority::Normal, Duration::from_secs(5), move |_| async move {
            let _ = tx.send("ran");
        }));

        assert_eq!(rx.recv().await, Some("ran"));
    }

    #[tokio::test]
    async fn test_respects_max_simultaneous_jobs() {
        let scheduler = scheduler(1);
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = gated_job(&scheduler, JobPriority::Normal, tx.clone(), gate.clone());
        let second = gated_job(&scheduler, JobPriority::Normal, tx.clone(), gate.clone());
        let second_id = second.id();
        scheduler.enqueue_all([first, second]);

        rx.recv().await.unwrap();
        assert_eq!(scheduler.running_count(), 1);
        assert!(scheduler.is_queued(second_id));

        gate.notify_one();
        assert_eq!(rx.recv().await, Some(second_id));
        gate.notify_one();
    }

    #[tokio::test]
    async fn test_dispatch_order_is_priority_then_submission() {
        let scheduler = scheduler(1);
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Occupy the only slot so the rest queue up.
        let blocker = gated_job(&scheduler, JobPriority::Normal, tx.clone(), gate.clone());
        scheduler.enqueue(blocker);
        rx.recv().await.unwrap();

        let low = gated_job(&scheduler, JobPriority::Low, tx.clone(), gate.clone());
        let normal = gated_job(&scheduler, JobPriority::Normal, tx.clone(), gate.clone());
        let high_a = gated_job(&scheduler, JobPriority::High, tx.clone(), gate.clone());
        let high_b = gated_job(&scheduler, JobPriority::High, tx.clone(), gate.clone());
        let expected = vec![high_a.id(), high_b.id(), normal.id(), low.id()];
        scheduler.enqueue_all([low, normal, high_a, high_b]);

        let mut observed = Vec::new();
        for _ in 0..expected.len() {
            gate.notify_one();
            observed.push(rx.recv().await.unwrap());
        }
        gate.notify_one();

        assert_eq!(observed, expected);
    }

    #[tokio::test]
    async fn test_immediate_bypasses_limit() {
        let scheduler = scheduler(1);
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        scheduler.enqueue(gated_job(&scheduler, JobPriority::Normal, tx.clone(), gate.clone()));
        rx.recv().await.unwrap();

        let immediate = gated_job(&scheduler, JobPriority::Immediate, tx.clone(), gate.clone());
        let immediate_id = immediate.id();
        scheduler.enqueue(immediate);

        assert_eq!(rx.recv().await, Some(immediate_id));
        assert_eq!(scheduler.running_count(), 2);
        gate.notify_waiters();
    }

    #[tokio::test]
    async fn test_promote_to_immediate_dispatches() {
        let scheduler = scheduler(1);
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        scheduler.enqueue(gated_job(&scheduler, JobPriority::Normal, tx.clone(), gate.clone()));
        rx.recv().await.unwrap();

        let waiting = gated_job(&scheduler, JobPriority::Low, tx.clone(), gate.clone());
        let waiting_id = waiting.id();
        scheduler.enqueue(waiting);
        assert!(scheduler.is_queued(waiting_id));

        assert!(scheduler.update_priority(waiting_id, JobPriority::Immediate));
        assert_eq!(rx.recv().await, Some(waiting_id));
        assert!(scheduler.is_running(waiting_id));
        gate.notify_waiters();
    }

    #[tokio::test]
    async fn test_update_priority_on_running_job_is_noop() {
        let scheduler = scheduler(2);
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let job = gated_job(&scheduler, JobPriority::Low, tx, gate.clone());
        let id = job.id();
        scheduler.enqueue(job);
        rx.recv().await.unwrap();

        assert!(!scheduler.update_priority(id, JobPriority::Immediate));
        assert!(!scheduler.update_priority(scheduler.next_job_id(), JobPriority::High));
        gate.notify_waiters();
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_job_is_interrupted() {
        let scheduler = scheduler(2);
        let completed = Arc::new(AtomicBool::new(false));

        let done = completed.clone();
        let id = scheduler.next_job_id();
        let job = Job::new(id, JobPriority::Normal, Duration::from_millis(500), move |_| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            done.store(true, Ordering::SeqCst);
        });
        let token = job.token();
        scheduler.enqueue(job);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!scheduler.is_running(id));
        assert!(token.is_cancelled());

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!completed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overdue_job_ignoring_token_is_aborted() {
        let scheduler = scheduler(1);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let id = scheduler.next_job_id();
        scheduler.enqueue(Job::new(id, JobPriority::Normal, Duration::from_millis(300), |_| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }));

        let next = scheduler.next_job_id();
        scheduler.enqueue(Job::new(next, JobPriority::Normal, Duration::from_secs(5), move |_| async move {
            let _ = tx.send(next);
        }));

        let got = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("queued job should run after the overdue one is reaped");
        assert_eq!(got, Some(next));
    }

    #[tokio::test]
    async fn test_executed_hook_runs_on_dispatch() {
        let scheduler = scheduler(1);
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let counter = calls.clone();
        let id = scheduler.next_job_id();
        let job = Job::new(id, JobPriority::High, Duration::from_secs(5), move |_| async move {
            let _ = tx.send(());
        })
        .with_on_executed(move |executed| {
            assert_eq!(executed, id);
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scheduler.enqueue(job);

        rx.recv().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_high_speed_mode_follows_queue_length() {
        let scheduler = scheduler(1);
        let gate = Arc::new(Notify::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let jobs: Vec<Job> = (0..6)
            .map(|_| gated_job(&scheduler, JobPriority::Normal, tx.clone(), gate.clone()))
            .collect();
        scheduler.enqueue_all(jobs);
        rx.recv().await.unwrap();

        assert_eq!(scheduler.queued_count(), 5);
        assert!(scheduler.is_high_speed());

        for _ in 0..4 {
            gate.notify_one();
            rx.recv().await.unwrap();
        }
        assert_eq!(scheduler.queued_count(), 1);
        assert!(!scheduler.is_high_speed());
        gate.notify_waiters();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_torn_down_when_idle_and_rebuilt() {
        let scheduler = scheduler(2);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first_tx = tx.clone();
        scheduler.enqueue(Job::new(scheduler.next_job_id(), JobPriority::Normal, Duration::from_secs(5), move |_| async move {
            let _ = first_tx.send(1);
        }));
        assert_eq!(rx.recv().await, Some(1));
        assert!(scheduler.has_worker_pool());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(scheduler.is_idle());
        assert!(!scheduler.has_worker_pool());

        scheduler.enqueue(Job::new(scheduler.next_job_id(), JobPriority::Normal, Duration::from_secs(5), move |_| async move {
            let _ = tx.send(2);
        }));
        assert_eq!(rx.recv().await, Some(2));
        assert!(scheduler.has_worker_pool());
    }
}
