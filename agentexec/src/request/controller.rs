//! Request controller.
//!
//! Groups pending [`AgentRequest`]s by agent identifier and fans out what
//! an execution reports:
//!
//! - completion detaches the whole group first, so requests arriving later
//!   form a new group for the next execution, then delivers in priority order
//!   (FIFO within a priority);
//! - progress goes to a sorted snapshot and leaves the group registered;
//! - requests past their own deadline receive an empty completion and are
//!   dropped, so no caller waits forever on work that never finishes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::agent_request::{AgentRequest, RequestId};
use super::delivery::Dispatcher;
use crate::cache::CachedValue;

pub(crate) struct RequestController {
    groups: Mutex<HashMap<String, Vec<Arc<AgentRequest>>>>,
    dispatcher: Dispatcher,
}

impl RequestController {
    pub(crate) fn new(dispatcher: Dispatcher) -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            dispatcher,
        }
    }

    pub(crate) fn add_agent_request(&self, request: AgentRequest) {
        trace!(identifier = request.identifier(), request = %request.id(), "Request registered");
        self.groups
            .lock()
            .entry(request.identifier().to_string())
            .or_default()
            .push(Arc::new(request));
    }

    /// Delivers a completion to every request of `identifier` and forgets them.
    ///
    /// Returns the number of requests delivered to.
    pub(crate) fn notify_agent_completion(
        &self,
        identifier: &str,
        value: Option<CachedValue>,
    ) -> usize {
        let Some(mut group) = self.groups.lock().remove(identifier) else {
            return 0;
        };

        group.sort_by_key(|request| request.priority());
        for request in &group {
            self.deliver_completion(request, value.clone());
        }
        debug!(identifier, listeners = group.len(), "Delivered agent completion");
        group.len()
    }

    /// Delivers progress to every request of `identifier`.
    pub(crate) fn notify_agent_progress(&self, identifier: &str, value: CachedValue) -> usize {
        let mut snapshot = match self.groups.lock().get(identifier) {
            Some(group) => group.clone(),
            None => return 0,
        };

        snapshot.sort_by_key(|request| request.priority());
        for request in &snapshot {
            self.deliver_progress(request, Arc::clone(&value));
        }
        snapshot.len()
    }

    /// Removes one request. Returns true if it was still pending.
    pub(crate) fn remove_request_for_agent(&self, identifier: &str, request_id: RequestId) -> bool {
        let mut groups = self.groups.lock();
        let Some(group) = groups.get_mut(identifier) else {
            return false;
        };

        let before = group.len();
        group.retain(|request| request.id() != request_id);
        let removed = group.len() != before;
        if group.is_empty() {
            groups.remove(identifier);
        }
        removed
    }

    pub(crate) fn has_active_requests(&self, identifier: &str) -> bool {
        self.groups
            .lock()
            .get(identifier)
            .is_some_and(|group| !group.is_empty())
    }

    pub(crate) fn has_pending_requests(&self) -> bool {
        !self.groups.lock().is_empty()
    }

    pub(crate) fn request_count(&self, identifier: &str) -> usize {
        self.groups.lock().get(identifier).map_or(0, Vec::len)
    }

    /// Delivers an empty completion to, and removes, every expired request.
    ///
    /// Returns the number of expired requests.
    pub(crate) fn notify_past_deadline(&self) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        {
            let mut groups = self.groups.lock();
            groups.retain(|_, group| {
                group.retain(|request| {
                    if request.is_past_deadline(now) {
                        expired.push(Arc::clone(request));
                        false
                    } else {
                        true
                    }
                });
                !group.is_empty()
            });
        }

        expired.sort_by_key(|request| request.priority());
        for request in &expired {
            debug!(
                identifier = request.identifier(),
                request = %request.id(),
                "Request passed its deadline, delivering empty completion"
            );
            self.deliver_completion(request, None);
        }
        expired.len()
    }

    /// Delivers a completion to one request, such as a cache hit that never
    /// joined a group.
    pub(crate) fn deliver_completion(&self, request: &AgentRequest, value: Option<CachedValue>) {
        self.dispatcher.completion(request, value);
    }

    pub(crate) fn deliver_progress(&self, request: &AgentRequest, value: CachedValue) {
        self.dispatcher.progress(request, value);
    }
}
