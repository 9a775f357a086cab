//! Agent executor.
//!
//! The executor coordinates everything else in the crate:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AgentExecutor                          │
//! │  run_agent / reattach ──► tether + request                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │ cache-check  │  │ agent        │  │ listener          │  │
//! │  │ scheduler    │  │ scheduler    │  │ scheduler         │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────┘  │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │ ResultCache  │  │ Reaper       │  │ RequestController │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Lifecycle of a request
//!
//! 1. `run_agent` validates the agent, registers a tether and a request.
//! 2. Unless the policy bypasses the cache, a cache-check job runs first and
//!    answers the request from the cache when it can.
//! 3. Otherwise the request joins the execution in flight for the
//!    identifier, or starts one.
//! 4. The agent's completion is cached, then delivered to every request of
//!    the identifier in priority order.
//!
//! A periodic cleanup expires requests past their own timeout, evicts
//! abandoned cache entries, cancels agents past their cancel timeout and
//! forgets agents past their maximum timeout.
//!
//! # Example
//!
//! ```ignore
//! use agentexec::{AgentExecutor, AgentPolicy, FnAgent, from_fn};
//!
//! let executor = AgentExecutor::new()?;
//! let agent = FnAgent::new("forecast", |ctx: AgentContext<String, ()>| async move {
//!     ctx.complete("sunny".to_string());
//! });
//! let tether = executor.run_agent(
//!     agent,
//!     AgentPolicy::default(),
//!     from_fn(|id, result| println!("{id}: {result:?}")),
//! )?;
//! ```

mod config;
mod core;
mod started;
mod stats;
mod tether;


pub use self::config::{ExecutorConfig, DEFAULT_EXECUTOR_CLEANUP_INTERVAL_MS, DEFAULT_EXECUTOR_IDLE_SECS};
pub use self::core::{AgentExecutor, AgentExecutorBuilder};
pub use self::stats::ExecutorStats;
pub use self::tether::AgentTether;
