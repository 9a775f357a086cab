//! Dependencies between agents.
//!
//! A composite agent that needs the results of other agents collects them
//! in a [`DependencyTracker`], launches them together and is told once every
//! one of them has delivered a completion:
//!
//! ```ignore
//! fn run(self: Arc<Self>, ctx: AgentContext<Summary, ()>) -> BoxFuture<'static, ()> {
//!     Box::pin(async move {
//!         let tracker = DependencyTracker::new(ctx.executor().clone());
//!         tracker.add_parallel(ForecastAgent::new(city), collect_forecast);
//!         tracker.add_parallel(AlertsAgent::new(city), collect_alerts);
//!         let done = ctx.clone();
//!         if tracker.execute(move || done.complete(summarize())).is_err() {
//!             ctx.complete_empty();
//!         }
//!     })
//! }
//! ```
//!
//! Each dependency keeps its own listener; the tracker wraps it to count
//! completions, including empty ones.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::agent::Agent;
use crate::error::ExecutorError;
use crate::executor::{AgentExecutor, AgentTether};
use crate::listener::AgentListener;
use crate::policy::AgentPolicy;

type PendingLaunch =
    Box<dyn FnOnce(&AgentExecutor, Arc<Countdown>) -> Result<AgentTether, ExecutorError> + Send>;

type CompletionHook = Box<dyn FnOnce() + Send>;

/// Counts outstanding dependencies and fires a hook once at zero.
struct Countdown {
    remaining: AtomicUsize,
    on_all_completed: Mutex<Option<CompletionHook>>,
}

impl Countdown {
    fn new() -> Self {
        Self {
            remaining: AtomicUsize::new(0),
            on_all_completed: Mutex::new(None),
        }
    }

    fn release(&self, n: usize) {
        if n == 0 {
            return;
        }
        if self.remaining.fetch_sub(n, Ordering::SeqCst) == n {
            let hook = self.on_all_completed.lock().take();
            if let Some(hook) = hook {
                debug!("All dependencies completed");
                hook();
            }
        }
    }
}

/// Wraps a dependency's listener to count its completion.
struct DependencyListener<L> {
    listener: L,
    countdown: Arc<Countdown>,
}

impl<R, P, L> AgentListener<R, P> for DependencyListener<L>
where
    L: AgentListener<R, P>,
{
    fn on_completion(&self, identifier: &str, result: Option<Arc<R>>) {
        self.listener.on_completion(identifier, result);
        self.countdown.release(1);
    }

    fn on_progress(&self, identifier: &str, progress: Arc<P>) {
        self.listener.on_progress(identifier, progress);
    }
}

/// Launches a group of agents and reports once all have completed.
pub struct DependencyTracker {
    executor: AgentExecutor,
    pending: Mutex<Vec<PendingLaunch>>,
    tethers: Mutex<Vec<AgentTether>>,
}

impl DependencyTracker {
    pub fn new(executor: AgentExecutor) -> Self {
        Self {
            executor,
            pending: Mutex::new(Vec::new()),
            tethers: Mutex::new(Vec::new()),
        }
    }

    /// Adds a dependency. Nothing runs until [`execute`](Self::execute).
    pub fn add<A, L>(&self, agent: A, policy: AgentPolicy, listener: L)
    where
        A: Agent,
        L: AgentListener<A::Output, A::Progress>,
    {
        let launch: PendingLaunch = Box::new(move |executor: &AgentExecutor, countdown: Arc<Countdown>| {
            executor.run_agent(agent, policy, DependencyListener { listener, countdown })
        });
        self.pending.lock().push(launch);
    }

    /// Adds a dependency whose listener is called on the parallel pool.
    pub fn add_parallel<A, L>(&self, agent: A, listener: L)
    where
        A: Agent,
        L: AgentListener<A::Output, A::Progress>,
    {
        self.add(agent, parallel_policy(), listener);
    }

    /// Adds a dependency whose listener is called on the executor's
    /// background queue.
    pub fn add_serial<A, L>(&self, agent: A, listener: L)
    where
        A: Agent,
        L: AgentListener<A::Output, A::Progress>,
    {
        self.add(agent, background_policy(), listener);
    }

    /// Number of dependencies added but not yet launched.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Launches every pending dependency and calls `on_all_completed` once
    /// all of them have delivered a completion. With nothing pending it is
    /// called right away.
    ///
    /// Returns the number of launched dependencies. If a launch fails the
    /// remaining ones are not launched, the error is returned and the hook
    /// still fires once the launched ones complete.
    pub fn execute<F>(&self, on_all_completed: F) -> Result<usize, ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        let launches: Vec<PendingLaunch> = std::mem::take(&mut *self.pending.lock());
        let total = launches.len();
        if total == 0 {
            on_all_completed();
            return Ok(0);
        }

        let countdown = Arc::new(Countdown::new());
        *countdown.on_all_completed.lock() = Some(Box::new(on_all_completed));
        countdown.remaining.store(total, Ordering::SeqCst);

        for (launched, launch) in launches.into_iter().enumerate() {
            match launch(&self.executor, Arc::clone(&countdown)) {
                Ok(tether) => self.tethers.lock().push(tether),
                Err(e) => {
                    warn!(error = %e, launched, total, "Dependency launch failed");
                    countdown.release(total - launched);
                    return Err(e);
                }
            }
        }
        debug!(count = total, "Dependencies launched");
        Ok(total)
    }

    /// Cancels every launched dependency.
    pub fn cancel_all(&self) {
        let tethers = std::mem::take(&mut *self.tethers.lock());
        if !tethers.is_empty() {
            debug!(count = tethers.len(), "Cancelling dependencies");
        }
        for tether in tethers {
            tether.cancel();
        }
    }
}

fn parallel_policy() -> AgentPolicy {
    AgentPolicy::builder()
        .deliver_in_parallel()
        .build()
        .unwrap_or_default()
}

fn background_policy() -> AgentPolicy {
    AgentPolicy::builder()
        .deliver_on_background()
        .build()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentContext, FnAgent};
    use crate::listener::{from_fn, FireAndForget};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn value_agent(
        identifier: &str,
        value: u32,
        delay: Duration,
    ) -> impl Agent<Output = u32, Progress = ()> {
        FnAgent::new(identifier, move |ctx: AgentContext<u32, ()>| async move {
            tokio::time::sleep(delay).await;
            ctx.complete(value);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_hook_fires_after_all_dependencies() {
        let executor = AgentExecutor::builder("deps").build().unwrap();
        let tracker = DependencyTracker::new(executor);
        let sum = Arc::new(AtomicUsize::new(0));

        for (i, delay) in [(1u32, 100u64), (2, 300), (3, 200)] {
            let sum = Arc::clone(&sum);
            tracker.add_parallel(
                value_agent(&format!("child-{i}"), i, Duration::from_millis(delay)),
                from_fn::<u32, (), _>(move |_, result| {
                    if let Some(v) = result {
                        sum.fetch_add(*v as usize, Ordering::SeqCst);
                    }
                }),
            );
        }
        assert_eq!(tracker.pending_count(), 3);

        let (tx, rx) = oneshot::channel();
        let observed = Arc::clone(&sum);
        let launched = tracker
            .execute(move || {
                let _ = tx.send(observed.load(Ordering::SeqCst));
            })
            .unwrap();

        assert_eq!(launched, 3);
        assert_eq!(tracker.pending_count(), 0);
        assert_eq!(rx.await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_nothing_pending_fires_immediately() {
        let executor = AgentExecutor::builder("deps").build().unwrap();
        let tracker = DependencyTracker::new(executor);

        let (tx, rx) = oneshot::channel();
        assert_eq!(tracker.execute(move || tx.send(()).unwrap()).unwrap(), 0);
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_launch_returns_error() {
        let executor = AgentExecutor::builder("deps").build().unwrap();
        let tracker = DependencyTracker::new(executor);

        tracker.add_parallel(value_agent("", 1, Duration::ZERO), FireAndForget);
        let result = tracker.execute(|| {});
        assert!(matches!(result, Err(ExecutorError::EmptyIdentifier)));
    }

    #[test]
    fn test_off_main_policies_build() {
        assert!(matches!(parallel_policy().delivery(), crate::policy::Delivery::Parallel));
        assert!(parallel_policy().bypass_cache());
        assert!(!background_policy().delivery().is_main());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_cancels_children() {
        let executor = AgentExecutor::builder("deps").build().unwrap();
        let tracker = DependencyTracker::new(executor.clone());

        tracker.add_serial(
            FnAgent::new("slow-child", |ctx: AgentContext<u32, ()>| async move {
                ctx.cancelled().await;
                ctx.complete_empty();
            }),
            FireAndForget,
        );
        tracker.execute(|| {}).unwrap();
        assert!(executor.has_started_agent("slow-child"));

        tracker.cancel_all();
        assert_eq!(executor.pending_request_count("slow-child"), 0);
    }
}
