//! Caller-held handle on a request.

use std::fmt;
use std::sync::Weak;

use super::core::ExecutorInner;
use crate::reaper::TetherId;
use crate::request::RequestId;

/// Handle returned by [`AgentExecutor::run_agent`](super::AgentExecutor::run_agent)
/// and [`AgentExecutor::reattach`](super::AgentExecutor::reattach).
///
/// A tether represents one caller's interest in an identifier. While any
/// tether for an identifier is alive its cached result is kept; once the
/// last one is gone the result is evicted after the abandoned-cache timeout.
///
/// - [`release`](Self::release) stops delivery to this caller.
/// - [`cancel`](Self::cancel) also cancels the agent when no other caller
///   is waiting for it.
/// - Dropping the tether only gives up interest in the cached result; the
///   listener still receives its completion.
#[must_use = "dropping a tether gives up interest in the cached result"]
pub struct AgentTether {
    identifier: String,
    request_id: RequestId,
    tether_id: TetherId,
    executor: Weak<ExecutorInner>,
    attached: bool,
}

impl AgentTether {
    pub(super) fn new(
        identifier: String,
        request_id: RequestId,
        tether_id: TetherId,
        executor: Weak<ExecutorInner>,
    ) -> Self {
        Self {
            identifier,
            request_id,
            tether_id,
            executor,
            attached: true,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Stops delivery to this caller and gives up interest.
    pub fn release(mut self) {
        if let Some(inner) = self.executor.upgrade() {
            inner.release_request(&self.identifier, self.request_id);
        }
        self.detach();
    }

    /// Like [`release`](Self::release), then cancels the running agent if no
    /// other request is waiting for it.
    pub fn cancel(mut self) {
        if let Some(inner) = self.executor.upgrade() {
            inner.cancel_request(&self.identifier, self.request_id);
        }
        self.detach();
    }

    fn detach(&mut self) {
        if !std::mem::take(&mut self.attached) {
            return;
        }
        if let Some(inner) = self.executor.upgrade() {
            inner.remove_tether(&self.identifier, self.tether_id);
        }
    }
}

impl Drop for AgentTether {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for AgentTether {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTether")
            .field("identifier", &self.identifier)
            .field("request_id", &self.request_id)
            .field("tether_id", &self.tether_id)
            .field("attached", &self.attached)
            .finish()
    }
}
