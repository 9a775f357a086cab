//! agentexec - coalescing, caching executor for asynchronous agents
//!
//! An *agent* is a unit of asynchronous work with a unique identifier that
//! produces at most one result. Callers submit agents to an
//! [`AgentExecutor`] together with an [`AgentPolicy`] and a listener. The
//! executor:
//!
//! - runs at most one instance per identifier, joining later requests to
//!   the running one
//! - serves recent results from a per-executor cache
//! - schedules agents by priority with a bounded number running at once
//! - delivers results on the requested serial queue or in parallel
//! - cancels agents that overrun and drops those that never finish
//!
//! ```no_run
//! use agentexec::{from_fn, AgentContext, AgentExecutor, AgentPolicy, FnAgent};
//!
//! # async fn example() -> Result<(), agentexec::ExecutorError> {
//! let executor = AgentExecutor::builder("weather").build()?;
//! let agent = FnAgent::new("forecast:paris", |ctx: AgentContext<String, ()>| async move {
//!     ctx.complete("sunny".to_string());
//! });
//! let _tether = executor.run_agent(
//!     agent,
//!     AgentPolicy::default(),
//!     from_fn::<String, (), _>(|id, forecast| println!("{id}: {forecast:?}")),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod cache;
pub mod config;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod inactivity;
pub mod listener;
pub mod logging;
pub mod policy;
pub mod reaper;
pub mod scheduler;
pub mod serial_queue;

mod request;

pub use agent::{Agent, AgentContext, AgentTimeouts, FnAgent};
pub use dependency::DependencyTracker;
pub use error::ExecutorError;
pub use executor::{AgentExecutor, AgentTether, ExecutorConfig};
pub use listener::{from_fn, AgentListener, FireAndForget};
pub use policy::{AgentPolicy, Delivery};
pub use request::RequestId;
pub use scheduler::JobPriority;

/// Version of the agentexec library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
