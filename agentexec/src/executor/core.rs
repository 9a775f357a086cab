//! The agent executor.
//!
//! Owns every moving part and implements the per-identifier state machine:
//!
//! ```text
//!            run_agent                      cache miss
//!  absent ─────────────► cache-checking ──────────────► running ──► absent
//!    │                         │ hit                       ▲   completion
//!    │                         ▼                           │
//!    │                   deliver to this                   │
//!    │                   request only                      │
//!    └─────────────── bypass / clear cache ────────────────┘
//! ```
//!
//! At most one execution per identifier is in flight. The started-agent map
//! is the execution lock: checking for an execution, joining it and starting
//! a new one all happen while it is held, as do completion (detaching the
//! request group, caching the value) and tether cancellation.
//!
//! Lock order is started agents, then request groups. Agent callbacks
//! (`cancel`, `on_progress_requested`) are never invoked with a lock held.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use super::config::ExecutorConfig;
use super::started::StartedAgent;
use super::stats::{ExecutorStats, StatsCounters};
use super::tether::AgentTether;
use crate::agent::{Agent, AgentContext, AgentControl, AgentRelay};
use crate::cache::{CachedValue, ResultCache};
use crate::error::ExecutorError;
use crate::inactivity::{InactivityCleanup, InactivityCleanupListener};
use crate::listener::{AgentListener, ErasedListener, TypedListener};
use crate::policy::{AgentPolicy, AgentPolicyBuilder};
use crate::reaper::{AbandonedCacheReaper, TetherId};
use crate::request::{AgentRequest, DeliveryTarget, Dispatcher, RequestController, RequestId};
use crate::scheduler::{Job, JobId, JobPriority, PriorityScheduler};
use crate::serial_queue::SerialQueueRegistry;

// =============================================================================
// Public handle
// =============================================================================

/// Coalescing, caching executor for [`Agent`]s.
///
/// Cloning yields another handle to the same executor. Agents receive a
/// handle through their [`AgentContext`].
#[derive(Clone)]
pub struct AgentExecutor {
    inner: Arc<ExecutorInner>,
}

impl AgentExecutor {
    /// Starts building an executor named `id`.
    pub fn builder(id: impl Into<String>) -> AgentExecutorBuilder {
        AgentExecutorBuilder::new(id)
    }

    /// Builds the default executor on the current tokio runtime.
    ///
    /// There is no process-wide instance; create one at the composition root
    /// and pass clones to whatever needs it.
    pub fn new() -> Result<Self, ExecutorError> {
        Self::builder("default").build()
    }

    /// Runs `agent`, or joins the execution already in flight for its
    /// identifier, and reports to `listener`.
    ///
    /// Unless the policy bypasses the cache, a cached value no older than the
    /// policy's max cache age is delivered instead of running anything.
    ///
    /// # Errors
    ///
    /// Fails with [`ExecutorError::EmptyIdentifier`] or
    /// [`ExecutorError::InvalidTimeouts`] before any work is started.
    pub fn run_agent<A, L>(
        &self,
        agent: A,
        policy: AgentPolicy,
        listener: L,
    ) -> Result<AgentTether, ExecutorError>
    where
        A: Agent,
        L: AgentListener<A::Output, A::Progress>,
    {
        self.inner.run_agent(Arc::new(agent), policy, listener)
    }

    /// [`run_agent`](Self::run_agent) with a policy built from the
    /// executor's configured defaults.
    pub fn run_agent_with_default_policy<A, L>(
        &self,
        agent: A,
        listener: L,
    ) -> Result<AgentTether, ExecutorError>
    where
        A: Agent,
        L: AgentListener<A::Output, A::Progress>,
    {
        let policy = AgentPolicyBuilder::with_defaults(self.inner.config.policy.clone()).build()?;
        self.run_agent(agent, policy, listener)
    }

    /// Reconnects to an identifier without ever starting work.
    ///
    /// Delivers a fresh enough cached value, or joins the execution in
    /// flight, or delivers an empty completion. A bypass flag on `policy` is
    /// ignored.
    pub fn reattach<R, P, L>(
        &self,
        identifier: &str,
        policy: AgentPolicy,
        listener: L,
    ) -> Result<AgentTether, ExecutorError>
    where
        R: Send + Sync + 'static,
        P: Send + Sync + 'static,
        L: AgentListener<R, P>,
    {
        self.inner.reattach::<R, P, L>(identifier, policy, listener)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Id of the serial queue used for [`Delivery::Background`](crate::policy::Delivery::Background).
    pub fn background_queue_id(&self) -> &str {
        &self.inner.background_queue_id
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.inner.cache
    }

    /// The serial queues callbacks are delivered on.
    pub fn queues(&self) -> &Arc<SerialQueueRegistry> {
        &self.inner.queues
    }

    /// Returns true while an execution for `identifier` is tracked.
    pub fn has_started_agent(&self, identifier: &str) -> bool {
        self.inner.started.lock().contains_key(identifier)
    }

    /// Effective priority of the execution for `identifier`, after escalation.
    pub fn started_agent_priority(&self, identifier: &str) -> Option<JobPriority> {
        self.inner
            .started
            .lock()
            .get(identifier)
            .map(StartedAgent::priority)
    }

    /// Number of requests waiting on `identifier`.
    pub fn pending_request_count(&self, identifier: &str) -> usize {
        self.inner.requests.request_count(identifier)
    }

    pub fn stats(&self) -> ExecutorStats {
        self.inner.stats.snapshot(self.inner.cache.stats())
    }

    /// Logs a statistics snapshot at info level.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            executor = %self.inner.id,
            submissions = stats.submissions,
            reattachments = stats.reattachments,
            coalesced = stats.coalesced,
            cache_hits = stats.cache_hits,
            cache_misses = stats.cache_misses,
            executions_started = stats.executions_started,
            executions_completed = stats.executions_completed,
            overdue_cancellations = stats.overdue_cancellations,
            abandoned_executions = stats.abandoned_executions,
            expired_requests = stats.expired_requests,
            coalescing_ratio = stats.coalescing_ratio(),
            cached_entries = self.inner.cache.len(),
            "Executor statistics"
        );
    }

    /// Runs one cleanup pass immediately.
    pub fn perform_cleanup(&self) {
        self.inner.perform_cleanup();
    }
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("id", &self.inner.id)
            .field("background_queue_id", &self.inner.background_queue_id)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`AgentExecutor`].
pub struct AgentExecutorBuilder {
    id: String,
    config: ExecutorConfig,
    queues: Option<Arc<SerialQueueRegistry>>,
    runtime: Option<Handle>,
}

impl AgentExecutorBuilder {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            config: ExecutorConfig::default(),
            queues: None,
            runtime: None,
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Shares a serial queue registry with other executors, so they deliver
    /// on the same main queue.
    pub fn with_queues(mut self, queues: Arc<SerialQueueRegistry>) -> Self {
        self.queues = Some(queues);
        self
    }

    /// Runtime to spawn work on. Defaults to the current runtime.
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Result<AgentExecutor, ExecutorError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| ExecutorError::NoRuntime)?,
        };
        let queues = self
            .queues
            .unwrap_or_else(|| Arc::new(SerialQueueRegistry::new(runtime.clone())));

        let inner = ExecutorInner::new(self.id, self.config, queues, runtime);
        info!(
            executor = %inner.id,
            background_queue = %inner.background_queue_id,
            max_jobs = inner.config.scheduler.max_simultaneous_jobs,
            "Agent executor created"
        );
        Ok(AgentExecutor { inner })
    }
}

// =============================================================================
// Executor state
// =============================================================================

pub(crate) struct ExecutorInner {
    id: String,
    config: ExecutorConfig,
    background_queue_id: String,
    agents: PriorityScheduler,
    cache_checks: PriorityScheduler,
    cache: ResultCache,
    reaper: AbandonedCacheReaper,
    requests: RequestController,
    queues: Arc<SerialQueueRegistry>,
    started: Mutex<HashMap<String, StartedAgent>>,
    request_ids: AtomicU64,
    tether_ids: AtomicU64,
    stats: StatsCounters,
    ticker: InactivityCleanup,
    me: Weak<ExecutorInner>,
}

impl ExecutorInner {
    fn new(
        id: String,
        config: ExecutorConfig,
        queues: Arc<SerialQueueRegistry>,
        runtime: Handle,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<ExecutorInner>| {
            let listener: Weak<dyn InactivityCleanupListener> = me.clone();
            let scheduler = |role: &str| {
                PriorityScheduler::new(
                    format!("{}-{}", id, role),
                    config.scheduler.clone(),
                    runtime.clone(),
                )
            };
            let dispatcher = Dispatcher::new(Arc::clone(&queues), scheduler("listeners"));

            ExecutorInner {
                background_queue_id: format!("{}-background-{}", id, Uuid::new_v4()),
                agents: scheduler("agents"),
                cache_checks: scheduler("cache"),
                cache: ResultCache::new(config.cache.clone(), runtime.clone()),
                reaper: AbandonedCacheReaper::new(config.abandoned_cache_timeout),
                requests: RequestController::new(dispatcher),
                queues,
                started: Mutex::new(HashMap::new()),
                request_ids: AtomicU64::new(1),
                tether_ids: AtomicU64::new(1),
                stats: StatsCounters::default(),
                ticker: InactivityCleanup::new(
                    format!("{}-executor", id),
                    config.inactivity(),
                    listener,
                    runtime,
                ),
                id,
                config,
                me: me.clone(),
            }
        })
    }

    fn run_agent<A, L>(
        &self,
        agent: Arc<A>,
        policy: AgentPolicy,
        listener: L,
    ) -> Result<AgentTether, ExecutorError>
    where
        A: Agent,
        L: AgentListener<A::Output, A::Progress>,
    {
        let identifier = agent.identifier().to_string();
        if identifier.is_empty() {
            return Err(ExecutorError::EmptyIdentifier);
        }
        agent.timeouts().validate()?;

        self.ticker.restart();
        StatsCounters::bump(&self.stats.submissions);

        let listener: Arc<dyn ErasedListener> =
            Arc::new(TypedListener::<A::Output, A::Progress, L>::new(listener));
        let request = self.new_request(&identifier, listener, policy);
        let tether = self.new_tether(&identifier, request.id());

        if request.policy().clear_cache() && self.cache.remove(&identifier) {
            debug!(identifier = %identifier, "Cache cleared by policy");
        }

        if request.policy().uses_cache() {
            self.enqueue_cache_check(agent, request);
        } else {
            trace!(identifier = %identifier, "Cache bypassed by policy");
            self.start_agent_request(agent, request)?;
        }
        Ok(tether)
    }

    fn reattach<R, P, L>(
        &self,
        identifier: &str,
        policy: AgentPolicy,
        listener: L,
    ) -> Result<AgentTether, ExecutorError>
    where
        R: Send + Sync + 'static,
        P: Send + Sync + 'static,
        L: AgentListener<R, P>,
    {
        if identifier.is_empty() {
            return Err(ExecutorError::EmptyIdentifier);
        }
        if !policy.uses_cache() {
            debug!(identifier, "Reattach ignores cache bypass");
        }

        self.ticker.restart();
        StatsCounters::bump(&self.stats.reattachments);

        let listener: Arc<dyn ErasedListener> = Arc::new(TypedListener::<R, P, L>::new(listener));
        let request = self.new_request(identifier, listener, policy);
        let tether = self.new_tether(identifier, request.id());

        let me = self.me.clone();
        let job = Job::new(
            self.cache_checks.next_job_id(),
            request.priority(),
            request.policy().timeout(),
            move |_| async move {
                if let Some(inner) = me.upgrade() {
                    inner.reattach_request::<R>(request);
                }
            },
        );
        self.cache_checks.enqueue(job);
        Ok(tether)
    }

    fn new_request(
        &self,
        identifier: &str,
        listener: Arc<dyn ErasedListener>,
        policy: AgentPolicy,
    ) -> AgentRequest {
        let id = RequestId::from(self.request_ids.fetch_add(1, Ordering::Relaxed));
        let target = DeliveryTarget::resolve(policy.delivery(), &self.background_queue_id);
        AgentRequest::new(id, identifier, listener, policy, target)
    }

    fn new_tether(&self, identifier: &str, request_id: RequestId) -> AgentTether {
        let tether_id = TetherId::from(self.tether_ids.fetch_add(1, Ordering::Relaxed));
        self.reaper.add_tether(identifier, tether_id);
        AgentTether::new(identifier.to_string(), request_id, tether_id, self.me.clone())
    }

    // -------------------------------------------------------------------------
    // Cache checks
    // -------------------------------------------------------------------------

    fn enqueue_cache_check<A: Agent>(&self, agent: Arc<A>, request: AgentRequest) {
        let me = self.me.clone();
        let job = Job::new(
            self.cache_checks.next_job_id(),
            request.priority(),
            request.policy().timeout(),
            move |_| async move {
                if let Some(inner) = me.upgrade() {
                    inner.check_cache_or_start(agent, request);
                }
            },
        );
        self.cache_checks.enqueue(job);
    }

    /// Reads a cached value of type `R` on behalf of `request`.
    fn cached_value<R: Send + Sync + 'static>(&self, request: &AgentRequest) -> Option<CachedValue> {
        let value: CachedValue = self
            .cache
            .get_typed::<R>(request.identifier(), request.max_cache_age())?;
        Some(value)
    }

    fn check_cache_or_start<A: Agent>(&self, agent: Arc<A>, request: AgentRequest) {
        if let Some(value) = self.cached_value::<A::Output>(&request) {
            StatsCounters::bump(&self.stats.cache_hits);
            debug!(identifier = request.identifier(), request = %request.id(), "Cache hit");
            self.requests.deliver_completion(&request, Some(value));
            return;
        }

        StatsCounters::bump(&self.stats.cache_misses);
        debug!(identifier = request.identifier(), request = %request.id(), "Cache miss, starting agent");
        if let Err(e) = self.start_agent_request(agent, request) {
            error!(error = %e, "Failed to start agent after cache miss");
        }
    }

    fn reattach_request<R: Send + Sync + 'static>(&self, request: AgentRequest) {
        if let Some(value) = self.cached_value::<R>(&request) {
            StatsCounters::bump(&self.stats.cache_hits);
            debug!(identifier = request.identifier(), request = %request.id(), "Reattached to cached result");
            self.requests.deliver_completion(&request, Some(value));
            return;
        }

        let mut started = self.started.lock();
        let Some(record) = started.get_mut(request.identifier()) else {
            drop(started);
            debug!(
                identifier = request.identifier(),
                request = %request.id(),
                "Nothing to reattach to, delivering empty completion"
            );
            self.requests.deliver_completion(&request, None);
            return;
        };

        let joined = self.join(record, request);
        drop(started);
        self.finish_join(joined);
    }

    // -------------------------------------------------------------------------
    // Executions
    // -------------------------------------------------------------------------

    /// Registers `request` and starts or joins the execution for its
    /// identifier.
    fn start_agent_request<A: Agent>(
        &self,
        agent: Arc<A>,
        request: AgentRequest,
    ) -> Result<(), ExecutorError> {
        let identifier = request.identifier().to_string();
        let mut started = self.started.lock();

        if let Some(record) = started.get_mut(&identifier) {
            let joined = self.join(record, request);
            drop(started);
            self.finish_join(joined);
            return Ok(());
        }

        let priority = request.priority();
        let cache_lifetime = request.max_cache_age();
        let timeouts = agent.timeouts();
        let job = self.agent_job(Arc::clone(&agent), &identifier, priority);
        let job_id = job.id();

        let control: Arc<dyn AgentControl> = agent;
        let record = StartedAgent::new(
            job_id,
            control,
            job.token(),
            timeouts,
            priority,
            cache_lifetime,
        );
        add_started_agent(&mut started, &identifier, record)?;
        self.requests.add_agent_request(request);
        drop(started);

        StatsCounters::bump(&self.stats.executions_started);
        debug!(identifier = %identifier, job = %job_id, priority = %priority, "Agent execution queued");
        self.agents.enqueue(job);
        Ok(())
    }

    /// Adds `request` to the execution in `record`. Runs under the execution
    /// lock; the returned [`Joined`] is finished after it is released.
    fn join(&self, record: &mut StartedAgent, request: AgentRequest) -> Joined {
        let priority = request.priority();
        record.raise_cache_lifetime(request.max_cache_age());
        let escalated = record.escalate(priority).then(|| (record.job_id(), priority));

        debug!(
            identifier = request.identifier(),
            request = %request.id(),
            job = %record.job_id(),
            "Request joined running agent"
        );
        self.requests.add_agent_request(request);
        StatsCounters::bump(&self.stats.coalesced);

        Joined {
            control: record.control(),
            escalated,
        }
    }

    fn finish_join(&self, joined: Joined) {
        if let Some((job_id, priority)) = joined.escalated {
            if self.agents.update_priority(job_id, priority) {
                debug!(job = %job_id, priority = %priority, "Queued agent escalated");
            }
        }
        joined.control.on_progress_requested();
    }

    fn agent_job<A: Agent>(&self, agent: Arc<A>, identifier: &str, priority: JobPriority) -> Job {
        let id = self.agents.next_job_id();
        let run_timeout = agent.timeouts().run;
        let identifier: Arc<str> = Arc::from(identifier);
        let relay: Arc<dyn AgentRelay> = Arc::new(StartedRelay {
            identifier: Arc::clone(&identifier),
            job_id: id,
            executor: self.me.clone(),
            completed: AtomicBool::new(false),
        });

        let me = self.me.clone();
        let hook_me = self.me.clone();
        let hook_identifier = Arc::clone(&identifier);
        Job::new(id, priority, run_timeout, move |token| async move {
            let Some(inner) = me.upgrade() else {
                return;
            };
            let ctx = AgentContext::new(identifier, relay, token, AgentExecutor { inner });
            agent.run(ctx).await;
        })
        .with_on_executed(move |job_id| {
            if let Some(inner) = hook_me.upgrade() {
                inner.on_agent_job_executed(&hook_identifier, job_id);
            }
        })
    }

    /// Starts the cancel and maximum clocks once the job is running.
    fn on_agent_job_executed(&self, identifier: &str, job_id: JobId) {
        let mut started = self.started.lock();
        if let Some(record) = started.get_mut(identifier) {
            if record.job_id() == job_id {
                record.mark_started(Instant::now());
                trace!(identifier, job = %job_id, "Agent job running");
            }
        }
    }

    fn on_agent_completed(&self, identifier: &str, job_id: JobId, value: Option<CachedValue>) {
        let mut started = self.started.lock();
        let record = match started.get(identifier) {
            Some(record) if record.job_id() == job_id => started.remove(identifier),
            Some(_) => {
                drop(started);
                debug!(identifier, job = %job_id, "Completion superseded by a newer execution");
                return;
            }
            None => None,
        };

        // A dropped execution that finishes anyway still serves waiting
        // requests, but its value is not cached.
        match (&record, &value) {
            (Some(record), Some(value)) => {
                self.cache
                    .put(identifier, Arc::clone(value), record.cache_lifetime());
            }
            (None, _) => {
                debug!(identifier, job = %job_id, "Late completion from a dropped execution");
            }
            _ => {}
        }
        let delivered = self.requests.notify_agent_completion(identifier, value);
        drop(started);

        if record.is_some() {
            StatsCounters::bump(&self.stats.executions_completed);
        }
        debug!(identifier, job = %job_id, listeners = delivered, "Agent completed");
        self.ticker.restart();
    }

    fn on_agent_progress(&self, identifier: &str, job_id: JobId, value: CachedValue) {
        let current = self
            .started
            .lock()
            .get(identifier)
            .is_some_and(|record| record.job_id() == job_id);
        if current {
            self.requests.notify_agent_progress(identifier, value);
        }
    }

    // -------------------------------------------------------------------------
    // Tethers
    // -------------------------------------------------------------------------

    pub(super) fn release_request(&self, identifier: &str, request_id: RequestId) {
        if self.requests.remove_request_for_agent(identifier, request_id) {
            debug!(identifier, request = %request_id, "Request released");
        }
    }

    pub(super) fn cancel_request(&self, identifier: &str, request_id: RequestId) {
        let control = {
            let mut started = self.started.lock();
            self.requests.remove_request_for_agent(identifier, request_id);
            if self.requests.has_active_requests(identifier) {
                None
            } else {
                started.get_mut(identifier).and_then(StartedAgent::cancel)
            }
        };

        if let Some(control) = control {
            info!(identifier, request = %request_id, "Agent cancelled, no listeners remain");
            control.cancel();
        } else {
            debug!(identifier, request = %request_id, "Request cancelled");
        }
    }

    pub(super) fn remove_tether(&self, identifier: &str, tether_id: TetherId) {
        self.reaper.remove_tether(identifier, tether_id);
        self.ticker.restart();
    }
}

impl InactivityCleanupListener for ExecutorInner {
    fn perform_cleanup(&self) {
        let expired = self.requests.notify_past_deadline();
        if expired > 0 {
            StatsCounters::add(&self.stats.expired_requests, expired);
            debug!(executor = %self.id, expired, "Expired requests past their deadline");
        }

        let reaped = self.reaper.sweep(&self.cache);
        if !reaped.armed.is_empty() {
            trace!(executor = %self.id, identifiers = ?reaped.armed, "Abandon deadlines armed");
        }

        let now = Instant::now();
        let mut to_cancel = Vec::new();
        {
            let mut started = self.started.lock();
            started.retain(|identifier, record| {
                if record.is_past_maximum_deadline(now) {
                    warn!(
                        identifier = %identifier,
                        job = %record.job_id(),
                        "Agent exceeded its maximum timeout, dropping execution"
                    );
                    StatsCounters::bump(&self.stats.abandoned_executions);
                    return false;
                }
                if record.is_past_cancel_deadline(now) {
                    if let Some(control) = record.cancel() {
                        warn!(
                            identifier = %identifier,
                            job = %record.job_id(),
                            "Agent exceeded its cancel timeout, cancelling"
                        );
                        StatsCounters::bump(&self.stats.overdue_cancellations);
                        to_cancel.push(control);
                    }
                }
                true
            });
        }

        for control in to_cancel {
            control.cancel();
        }
    }

    fn is_busy(&self) -> bool {
        !self.started.lock().is_empty()
            || self.requests.has_pending_requests()
            || self.reaper.has_pending_deadlines()
    }

    fn enter_idle_state(&self) {
        if self.queues.stop(&self.background_queue_id) {
            debug!(executor = %self.id, "Executor idle, background queue stopped");
        }
    }
}

impl Drop for ExecutorInner {
    fn drop(&mut self) {
        self.queues.stop(&self.background_queue_id);
        debug!(executor = %self.id, "Agent executor dropped");
    }
}

/// Work left over from joining an execution, done without the lock.
struct Joined {
    control: Arc<dyn AgentControl>,
    escalated: Option<(JobId, JobPriority)>,
}

fn add_started_agent(
    started: &mut HashMap<String, StartedAgent>,
    identifier: &str,
    record: StartedAgent,
) -> Result<(), ExecutorError> {
    if started.contains_key(identifier) {
        error!(identifier, "Second execution registered for one identifier");
        return Err(ExecutorError::DuplicateAgent {
            identifier: identifier.to_string(),
        });
    }
    started.insert(identifier.to_string(), record);
    Ok(())
}

// =============================================================================
// Relay
// =============================================================================

/// What an agent's context reports into. Bound to one execution: progress
/// from an execution that was dropped is discarded, its completion is still
/// delivered unless a newer execution took over.
struct StartedRelay {
    identifier: Arc<str>,
    job_id: JobId,
    executor: Weak<ExecutorInner>,
    completed: AtomicBool,
}

impl AgentRelay for StartedRelay {
    fn completed(&self, value: Option<CachedValue>) {
        if self.completed.swap(true, Ordering::SeqCst) {
            debug!(identifier = %self.identifier, job = %self.job_id, "Repeated completion ignored");
            return;
        }
        if let Some(inner) = self.executor.upgrade() {
            inner.on_agent_completed(&self.identifier, self.job_id, value);
        }
    }

    fn progressed(&self, value: CachedValue) {
        if self.completed.load(Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.executor.upgrade() {
            inner.on_agent_progress(&self.identifier, self.job_id, value);
        }
    }
}
