//! One caller's request for an agent's result.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::listener::ErasedListener;
use crate::policy::{AgentPolicy, Delivery};
use crate::scheduler::JobPriority;
use crate::serial_queue::MAIN_QUEUE_ID;

/// Identifier of a request, unique within one executor.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(u64);

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

/// Where a request's callbacks actually go, with executor-specific queue
/// ids resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeliveryTarget {
    Serial(String),
    Parallel,
}

impl DeliveryTarget {
    pub(crate) fn resolve(delivery: &Delivery, background_queue_id: &str) -> Self {
        match delivery {
            Delivery::Main => DeliveryTarget::Serial(MAIN_QUEUE_ID.to_string()),
            Delivery::Background => DeliveryTarget::Serial(background_queue_id.to_string()),
            Delivery::Queue(id) => DeliveryTarget::Serial(id.clone()),
            Delivery::Parallel => DeliveryTarget::Parallel,
        }
    }
}

/// A listener waiting on an agent identifier, with its policy snapshot and
/// the absolute deadline after which it receives an empty completion.
pub(crate) struct AgentRequest {
    id: RequestId,
    identifier: String,
    listener: Arc<dyn ErasedListener>,
    policy: AgentPolicy,
    target: DeliveryTarget,
    deadline: Instant,
}

impl AgentRequest {
    pub(crate) fn new(
        id: RequestId,
        identifier: impl Into<String>,
        listener: Arc<dyn ErasedListener>,
        policy: AgentPolicy,
        target: DeliveryTarget,
    ) -> Self {
        let deadline = Instant::now() + policy.timeout();
        Self {
            id,
            identifier: identifier.into(),
            listener,
            policy,
            target,
            deadline,
        }
    }

    pub(crate) fn id(&self) -> RequestId {
        self.id
    }

    pub(crate) fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn listener(&self) -> &Arc<dyn ErasedListener> {
        &self.listener
    }

    pub(crate) fn priority(&self) -> JobPriority {
        self.policy.priority()
    }

    pub(crate) fn max_cache_age(&self) -> Duration {
        self.policy.max_cache_age()
    }

    pub(crate) fn policy(&self) -> &AgentPolicy {
        &self.policy
    }

    pub(crate) fn target(&self) -> &DeliveryTarget {
        &self.target
    }

    pub(crate) fn is_past_deadline(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

impl fmt::Debug for AgentRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRequest")
            .field("id", &self.id)
            .field("identifier", &self.identifier)
            .field("priority", &self.policy.priority())
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_delivery_targets() {
        assert_eq!(
            DeliveryTarget::resolve(&Delivery::Main, "bg-1"),
            DeliveryTarget::Serial(MAIN_QUEUE_ID.to_string())
        );
        assert_eq!(
            DeliveryTarget::resolve(&Delivery::Background, "bg-1"),
            DeliveryTarget::Serial("bg-1".to_string())
        );
        assert_eq!(
            DeliveryTarget::resolve(&Delivery::Queue("io".to_string()), "bg-1"),
            DeliveryTarget::Serial("io".to_string())
        );
        assert_eq!(
            DeliveryTarget::resolve(&Delivery::Parallel, "bg-1"),
            DeliveryTarget::Parallel
        );
    }
}
