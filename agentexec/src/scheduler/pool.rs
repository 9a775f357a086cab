//! Lazily created worker pool.
//!
//! The pool is a [`TaskTracker`] bound to the runtime captured at
//! construction. It is created on the first dispatch and torn down when the
//! owning scheduler goes idle; a later dispatch transparently builds a fresh
//! one. Tearing down closes the tracker without aborting tasks still running
//! in it.

use parking_lot::Mutex;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Worker pool backing a scheduler.
pub struct WorkerPool {
    name: String,
    runtime: Handle,
    active: Mutex<Option<TaskTracker>>,
    generation: Mutex<u64>,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, runtime: Handle) -> Self {
        Self {
            name: name.into(),
            runtime,
            active: Mutex::new(None),
            generation: Mutex::new(0),
        }
    }

    /// Spawns a task, creating the pool first if necessary.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut active = self.active.lock();
        let tracker = active.get_or_insert_with(|| {
            let mut generation = self.generation.lock();
            *generation += 1;
            debug!(pool = %self.name, generation = *generation, "Worker pool created");
            TaskTracker::new()
        });
        tracker.spawn_on(task, &self.runtime)
    }

    /// Tears the pool down. Running tasks keep running to completion.
    pub fn shutdown(&self) {
        if let Some(tracker) = self.active.lock().take() {
            tracker.close();
            debug!(
                pool = %self.name,
                outstanding = tracker.len(),
                "Worker pool torn down"
            );
        }
    }

    /// Returns true while a pool exists.
    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Number of times a pool has been created.
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }
}
