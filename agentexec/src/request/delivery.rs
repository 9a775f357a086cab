//! Hands callbacks to a request's delivery target.

use std::sync::Arc;
use tracing::warn;

use super::agent_request::{AgentRequest, DeliveryTarget};
use crate::cache::CachedValue;
use crate::listener::ErasedListener;
use crate::scheduler::{Job, PriorityScheduler};
use crate::serial_queue::SerialQueueRegistry;

/// Routes a callback either onto a named serial queue or, for parallel
/// delivery, onto the listener scheduler as its own job.
pub(crate) struct Dispatcher {
    queues: Arc<SerialQueueRegistry>,
    listeners: PriorityScheduler,
}

impl Dispatcher {
    pub(crate) fn new(queues: Arc<SerialQueueRegistry>, listeners: PriorityScheduler) -> Self {
        Self { queues, listeners }
    }

    pub(crate) fn completion(&self, request: &AgentRequest, value: Option<CachedValue>) {
        self.dispatch(request, move |listener, identifier| {
            listener.deliver_completion(identifier, value)
        });
    }

    pub(crate) fn progress(&self, request: &AgentRequest, value: CachedValue) {
        self.dispatch(request, move |listener, identifier| {
            listener.deliver_progress(identifier, value)
        });
    }

    fn dispatch<F>(&self, request: &AgentRequest, deliver: F)
    where
        F: FnOnce(&dyn ErasedListener, &str) + Send + 'static,
    {
        let listener = Arc::clone(request.listener());
        let identifier = request.identifier().to_string();

        match request.target() {
            DeliveryTarget::Serial(queue_id) => {
                let queue = self.queues.queue(queue_id);
                let posted = queue.post(move || deliver(listener.as_ref(), &identifier));
                if !posted {
                    warn!(
                        queue = %queue_id,
                        request = %request.id(),
                        "Delivery queue closed before the callback could be posted"
                    );
                }
            }
            DeliveryTarget::Parallel => {
                let policy = request.policy();
                let job = Job::new(
                    self.listeners.next_job_id(),
                    policy.priority(),
                    policy.parallel_callback_timeout(),
                    move |_| async move { deliver(listener.as_ref(), &identifier) },
                );
                self.listeners.enqueue(job);
            }
        }
    }
}
