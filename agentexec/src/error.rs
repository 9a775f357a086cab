//! Error types for the executor.
//!
//! Configuration mistakes (empty identifiers, bad timeout ordering, conflicting
//! policy options, duplicate registrations) fail fast at the call that caused
//! them. Execution overruns are never reported here; they surface as an empty
//! completion delivered to the listener.

use thiserror::Error;

use crate::agent::TimeoutError;
use crate::policy::PolicyError;

/// Errors returned by executor operations.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// An agent or reattach request used an empty identifier.
    #[error("agent identifier must not be empty")]
    EmptyIdentifier,

    /// The agent's timeouts violate `cancel < run < maximum`.
    #[error("invalid agent timeouts: {0}")]
    InvalidTimeouts(#[from] TimeoutError),

    /// The policy could not be built.
    #[error("invalid agent policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    /// A second execution was registered for an identifier that already has one.
    #[error("agent '{identifier}' already has a started execution")]
    DuplicateAgent { identifier: String },

    /// The executor was built outside of a tokio runtime.
    #[error("no tokio runtime available; build the executor inside a runtime or supply a handle")]
    NoRuntime,
}
