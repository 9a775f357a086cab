//! Named serial delivery queues.
//!
//! Each queue is a FIFO channel drained by one tokio task, so callbacks
//! posted to the same queue run one at a time in posting order. Queues are
//! created on first use and stopped explicitly; a stopped queue drains what
//! was already posted and a later [`SerialQueueRegistry::queue`] call
//! creates a fresh one under the same id.
//!
//! [`MAIN_QUEUE_ID`] is reserved for the application's main queue. Each
//! executor also reserves one generated id for its background delivery.

use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Reserved id of the application's main queue.
pub const MAIN_QUEUE_ID: &str = "main";

type QueueTask = Box<dyn FnOnce() + Send>;

/// Handle to post work onto one serial queue.
#[derive(Clone)]
pub struct SerialQueue {
    id: Arc<str>,
    sender: mpsc::UnboundedSender<QueueTask>,
}

impl SerialQueue {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Posts a task. Returns false if the queue has been stopped and drained.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender.send(Box::new(task)).is_ok()
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue").field("id", &self.id).finish()
    }
}

/// Registry of named serial queues.
pub struct SerialQueueRegistry {
    runtime: Handle,
    queues: DashMap<String, SerialQueue>,
}

impl SerialQueueRegistry {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            queues: DashMap::new(),
        }
    }

    /// Returns the queue for `id`, creating it if needed.
    pub fn queue(&self, id: &str) -> SerialQueue {
        if let Some(queue) = self.queues.get(id) {
            if !queue.sender.is_closed() {
                return queue.clone();
            }
        }

        self.queues
            .entry(id.to_string())
            .and_modify(|queue| {
                if queue.sender.is_closed() {
                    *queue = self.spawn_queue(id);
                }
            })
            .or_insert_with(|| self.spawn_queue(id))
            .clone()
    }

    /// Stops a queue. Tasks already posted still run. Returns true if the
    /// queue existed.
    pub fn stop(&self, id: &str) -> bool {
        let stopped = self.queues.remove(id).is_some();
        if stopped {
            debug!(queue = id, "Serial queue stopped");
        }
        stopped
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.queues.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    fn spawn_queue(&self, id: &str) -> SerialQueue {
        let (sender, mut receiver) = mpsc::unbounded_channel::<QueueTask>();
        let name = id.to_string();
        self.runtime.spawn(async move {
            while let Some(task) = receiver.recv().await {
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    error!(queue = %name, "Callback panicked on serial queue");
                }
            }
            debug!(queue = %name, "Serial queue drained");
        });
        debug!(queue = id, "Serial queue created");

        SerialQueue {
            id: Arc::from(id),
            sender,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_tasks_run_in_post_order() {
        let registry = SerialQueueRegistry::new(Handle::current());
        let queue = registry.queue("bg");
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..10 {
            let seen = seen.clone();
            assert!(queue.post(move || seen.lock().push(i)));
        }
        let (tx, rx) = oneshot::channel();
        queue.post(move || {
            let _ = tx.send(());
        });
        rx.await.unwrap();

        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_same_id_returns_same_queue() {
        let registry = SerialQueueRegistry::new(Handle::current());
        let a = registry.queue(MAIN_QUEUE_ID);
        let b = registry.queue(MAIN_QUEUE_ID);

        assert!(a.sender.same_channel(&b.sender));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_drains_then_recreates() {
        let registry = SerialQueueRegistry::new(Handle::current());
        let queue = registry.queue("bg");
        let (tx, rx) = oneshot::channel();
        queue.post(move || {
            let _ = tx.send("drained");
        });

        assert!(registry.stop("bg"));
        assert!(!registry.is_running("bg"));
        drop(queue);
        assert_eq!(rx.await.unwrap(), "drained");

        let fresh = registry.queue("bg");
        let (tx, rx) = oneshot::channel();
        fresh.post(move || {
            let _ = tx.send("fresh");
        });
        assert_eq!(rx.await.unwrap(), "fresh");
    }

    #[tokio::test]
    async fn test_panicking_callback_does_not_kill_queue() {
        let registry = SerialQueueRegistry::new(Handle::current());
        let queue = registry.queue("bg");

        queue.post(|| panic!("listener bug"));
        let (tx, rx) = oneshot::channel();
        queue.post(move || {
            let _ = tx.send(1);
        });

        assert_eq!(rx.await.unwrap(), 1);
    }
}
