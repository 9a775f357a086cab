//! The agent contract.
//!
//! An [`Agent`] is a named, cancellable unit of asynchronous work. All agents
//! sharing an identifier are considered interchangeable: while one is running
//! every other request for that identifier joins it instead of starting new
//! work.
//!
//! An agent reports through the [`AgentContext`] it receives in
//! [`Agent::run`]: [`AgentContext::complete`] exactly once when done, and
//! [`AgentContext::progress`] as often as it likes before that. The context
//! also carries the cancellation token and a handle to the executor, so an
//! agent can submit further agents of its own.
//!
//! Each agent carries three escalating timeouts, measured from the moment
//! its job starts running:
//!
//! | Timeout   | Effect when exceeded                                  |
//! |-----------|-------------------------------------------------------|
//! | `cancel`  | [`Agent::cancel`] is called and the token is cancelled |
//! | `run`     | the job's task is aborted by the scheduler            |
//! | `maximum` | the execution record is dropped                       |

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::cache::CachedValue;
use crate::executor::AgentExecutor;

// =============================================================================
// Timeouts
// =============================================================================

/// Default time before an agent is asked to cancel.
pub const DEFAULT_CANCEL_TIMEOUT_SECS: u64 = 120;

/// Default time before an agent's task is aborted.
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 180;

/// Default time before an agent's execution record is dropped.
pub const DEFAULT_MAXIMUM_TIMEOUT_SECS: u64 = 300;

/// Invalid timeout combinations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeoutError {
    #[error("{name} timeout must be greater than zero")]
    Zero { name: &'static str },

    #[error("cancel timeout {cancel:?} must be shorter than run timeout {run:?}")]
    CancelNotBeforeRun { cancel: Duration, run: Duration },

    #[error("maximum timeout {maximum:?} must be longer than run timeout {run:?}")]
    MaximumNotAfterRun { run: Duration, maximum: Duration },
}

/// The three escalating timeouts of an agent.
///
/// Fields are public so agents can describe themselves freely; the executor
/// validates them with [`AgentTimeouts::validate`] before any work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentTimeouts {
    pub cancel: Duration,
    pub run: Duration,
    pub maximum: Duration,
}

impl AgentTimeouts {
    /// Creates validated timeouts.
    pub fn new(cancel: Duration, run: Duration, maximum: Duration) -> Result<Self, TimeoutError> {
        let timeouts = Self {
            cancel,
            run,
            maximum,
        };
        timeouts.validate()?;
        Ok(timeouts)
    }

    /// Checks `0 < cancel < run < maximum`.
    pub fn validate(&self) -> Result<(), TimeoutError> {
        for (name, value) in [
            ("cancel", self.cancel),
            ("run", self.run),
            ("maximum", self.maximum),
        ] {
            if value.is_zero() {
                return Err(TimeoutError::Zero { name });
            }
        }
        if self.cancel >= self.run {
            return Err(TimeoutError::CancelNotBeforeRun {
                cancel: self.cancel,
                run: self.run,
            });
        }
        if self.maximum <= self.run {
            return Err(TimeoutError::MaximumNotAfterRun {
                run: self.run,
                maximum: self.maximum,
            });
        }
        Ok(())
    }
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            cancel: Duration::from_secs(DEFAULT_CANCEL_TIMEOUT_SECS),
            run: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            maximum: Duration::from_secs(DEFAULT_MAXIMUM_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// Agent trait
// =============================================================================

/// A named, cancellable unit of asynchronous work.
pub trait Agent: Send + Sync + 'static {
    /// Completion value shared with every listener.
    type Output: Send + Sync + 'static;
    /// Progress value shared with every listener.
    type Progress: Send + Sync + 'static;

    /// Non-empty identifier. Agents with equal identifiers are coalesced.
    fn identifier(&self) -> &str;

    fn timeouts(&self) -> AgentTimeouts {
        AgentTimeouts::default()
    }

    /// Called when the agent should stop. The context token is cancelled too.
    fn cancel(&self) {}

    /// Called when a new listener joins a running execution. Agents that
    /// track progress should report it again through their context.
    fn on_progress_requested(&self) {}

    /// Runs the agent. Invoked exactly once per execution.
    fn run(self: Arc<Self>, ctx: AgentContext<Self::Output, Self::Progress>) -> BoxFuture<'static, ()>;
}

/// Object-safe view of an agent used by the executor after type erasure.
pub(crate) trait AgentControl: Send + Sync {
    fn cancel(&self);
    fn on_progress_requested(&self);
}

impl<A: Agent> AgentControl for A {
    fn cancel(&self) {
        Agent::cancel(self);
    }

    fn on_progress_requested(&self) {
        Agent::on_progress_requested(self);
    }
}

/// Receives what an agent reports. Implemented by the executor.
pub(crate) trait AgentRelay: Send + Sync {
    fn completed(&self, value: Option<CachedValue>);
    fn progressed(&self, value: CachedValue);
}

// =============================================================================
// Context
// =============================================================================

/// Handle given to a running agent.
pub struct AgentContext<R, P> {
    identifier: Arc<str>,
    relay: Arc<dyn AgentRelay>,
    token: CancellationToken,
    executor: AgentExecutor,
    _types: PhantomData<fn(R, P)>,
}

impl<R, P> AgentContext<R, P>
where
    R: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) fn new(
        identifier: Arc<str>,
        relay: Arc<dyn AgentRelay>,
        token: CancellationToken,
        executor: AgentExecutor,
    ) -> Self {
        Self {
            identifier,
            relay,
            token,
            executor,
            _types: PhantomData,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Reports the result. Only the first completion of an execution counts.
    pub fn complete(&self, result: R) {
        let value: CachedValue = Arc::new(result);
        self.relay.completed(Some(value));
    }

    /// Reports an already shared result.
    pub fn complete_shared(&self, result: Arc<R>) {
        let value: CachedValue = result;
        self.relay.completed(Some(value));
    }

    /// Finishes without a value. Listeners receive `None` and nothing is cached.
    pub fn complete_empty(&self) {
        self.relay.completed(None);
    }

    pub fn progress(&self, progress: P) {
        self.relay.progressed(Arc::new(progress));
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the execution is cancelled or interrupted.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The executor running this agent.
    pub fn executor(&self) -> &AgentExecutor {
        &self.executor
    }
}

impl<R, P> Clone for AgentContext<R, P> {
    fn clone(&self) -> Self {
        Self {
            identifier: Arc::clone(&self.identifier),
            relay: Arc::clone(&self.relay),
            token: self.token.clone(),
            executor: self.executor.clone(),
            _types: PhantomData,
        }
    }
}

impl<R, P> fmt::Debug for AgentContext<R, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("identifier", &self.identifier)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Closure agent
// =============================================================================

/// Agent built from an identifier and an async closure.
///
/// ```ignore
/// let agent = FnAgent::new("forecast", |ctx: AgentContext<String, ()>| async move {
///     ctx.complete(fetch_forecast().await);
/// });
/// ```
pub struct FnAgent<R, P, F> {
    identifier: String,
    timeouts: AgentTimeouts,
    body: F,
    _types: PhantomData<fn() -> (R, P)>,
}

impl<R, P, F, Fut> FnAgent<R, P, F>
where
    F: Fn(AgentContext<R, P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    pub fn new(identifier: impl Into<String>, body: F) -> Self {
        Self {
            identifier: identifier.into(),
            timeouts: AgentTimeouts::default(),
            body,
            _types: PhantomData,
        }
    }

    pub fn with_timeouts(mut self, timeouts: AgentTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

impl<R, P, F, Fut> Agent for FnAgent<R, P, F>
where
    R: Send + Sync + 'static,
    P: Send + Sync + 'static,
    F: Fn(AgentContext<R, P>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    type Output = R;
    type Progress = P;

    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn timeouts(&self) -> AgentTimeouts {
        self.timeouts
    }

    fn run(self: Arc<Self>, ctx: AgentContext<R, P>) -> BoxFuture<'static, ()> {
        Box::pin((self.body)(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_default_timeouts_are_valid() {
        let timeouts = AgentTimeouts::default();
        assert!(timeouts.validate().is_ok());
        assert_eq!(timeouts.cancel, secs(120));
        assert_eq!(timeouts.run, secs(180));
        assert_eq!(timeouts.maximum, secs(300));
    }

    #[test]
    fn test_valid_ordering() {
        assert!(AgentTimeouts::new(secs(5), secs(6), secs(8)).is_ok());
    }

    #[test]
    fn test_cancel_not_before_run() {
        assert_eq!(
            AgentTimeouts::new(secs(6), secs(6), secs(8)),
            Err(TimeoutError::CancelNotBeforeRun {
                cancel: secs(6),
                run: secs(6)
            })
        );
        assert!(AgentTimeouts::new(secs(7), secs(6), secs(8)).is_err());
    }

    #[test]
    fn test_maximum_not_after_run() {
        assert_eq!(
            AgentTimeouts::new(secs(5), secs(6), secs(6)),
            Err(TimeoutError::MaximumNotAfterRun {
                run: secs(6),
                maximum: secs(6)
            })
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert_eq!(
            AgentTimeouts::new(Duration::ZERO, secs(6), secs(8)),
            Err(TimeoutError::Zero { name: "cancel" })
        );
    }

    #[test]
    fn test_public_fields_validated_later() {
        let timeouts = AgentTimeouts {
            cancel: secs(10),
            run: secs(5),
            maximum: secs(20),
        };
        assert!(timeouts.validate().is_err());
    }
}
