//! Priority-ordered job queue.
//!
//! Jobs are kept in a `BTreeMap` keyed by `(priority, id)`, which yields the
//! scheduler's dispatch order directly: most urgent priority first, and FIFO
//! within a priority because ids are handed out in submission order. A side
//! index from id to priority allows removal and re-prioritization by id.

use std::collections::{BTreeMap, HashMap};

use super::job::{Job, JobId, JobPriority};

/// Queue of jobs waiting for a free slot.
#[derive(Default)]
pub struct PriorityQueue {
    ordered: BTreeMap<(JobPriority, JobId), Job>,
    index: HashMap<JobId, JobPriority>,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job. A job with the same id replaces the queued one.
    pub fn push(&mut self, job: Job) {
        if let Some(previous) = self.index.insert(job.id, job.priority) {
            self.ordered.remove(&(previous, job.id));
        }
        self.ordered.insert((job.priority, job.id), job);
    }

    /// Removes and returns the most urgent, oldest job.
    pub fn pop(&mut self) -> Option<Job> {
        let (_, job) = self.ordered.pop_first()?;
        self.index.remove(&job.id);
        Some(job)
    }

    /// Returns the id of the job that would be popped next.
    pub fn peek_id(&self) -> Option<JobId> {
        self.ordered.keys().next().map(|(_, id)| *id)
    }

    /// Removes a job by id.
    pub fn remove(&mut self, id: JobId) -> Option<Job> {
        let priority = self.index.remove(&id)?;
        self.ordered.remove(&(priority, id))
    }

    /// Moves a queued job to a new priority. Returns false if the job is not queued.
    pub fn reprioritize(&mut self, id: JobId, priority: JobPriority) -> bool {
        match self.remove(id) {
            Some(mut job) => {
                job.priority = priority;
                self.push(job);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn priority_of(&self, id: JobId) -> Option<JobPriority> {
        self.index.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn job(id: u64, priority: JobPriority) -> Job {
        Job::new(JobId::from(id), priority, Duration::from_secs(1), |_| async {})
    }

    fn drain(queue: &mut PriorityQueue) -> Vec<u64> {
        std::iter::from_fn(|| queue.pop())
            .map(|j| j.id().as_u64())
            .collect()
    }

    #[test]
    fn test_pop_orders_by_priority_then_id() {
        let mut queue = PriorityQueue::new();
        queue.push(job(0, JobPriority::Low));
        queue.push(job(1, JobPriority::Normal));
        queue.push(job(2, JobPriority::High));
        queue.push(job(3, JobPriority::Normal));
        queue.push(job(4, JobPriority::High));

        assert_eq!(queue.peek_id(), Some(JobId::from(2)));
        assert_eq!(drain(&mut queue), vec![2, 4, 1, 3, 0]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_by_id() {
        let mut queue = PriorityQueue::new();
        queue.push(job(0, JobPriority::Normal));
        queue.push(job(1, JobPriority::Normal));

        let removed = queue.remove(JobId::from(0)).expect("job should be queued");
        assert_eq!(removed.id(), JobId::from(0));
        assert!(!queue.contains(JobId::from(0)));
        assert!(queue.remove(JobId::from(0)).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_reprioritize_moves_job_forward() {
        let mut queue = PriorityQueue::new();
        queue.push(job(0, JobPriority::Normal));
        queue.push(job(1, JobPriority::Normal));
        queue.push(job(2, JobPriority::Low));

        assert!(queue.reprioritize(JobId::from(2), JobPriority::High));
        assert_eq!(queue.priority_of(JobId::from(2)), Some(JobPriority::High));
        assert_eq!(drain(&mut queue), vec![2, 0, 1]);
    }

    #[test]
    fn test_reprioritize_unknown_job() {
        let mut queue = PriorityQueue::new();
        assert!(!queue.reprioritize(JobId::from(9), JobPriority::High));
    }

    #[test]
    fn test_push_same_id_replaces() {
        let mut queue = PriorityQueue::new();
        queue.push(job(5, JobPriority::Low));
        queue.push(job(5, JobPriority::High));

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.priority_of(JobId::from(5)), Some(JobPriority::High));
    }

    fn priority_strategy() -> impl Strategy<Value = JobPriority> {
        prop_oneof![
            Just(JobPriority::Immediate),
            Just(JobPriority::High),
            Just(JobPriority::Normal),
            Just(JobPriority::Low),
        ]
    }

    proptest! {
        #[test]
        fn prop_dequeue_order_is_priority_then_submission(
            priorities in proptest::collection::vec(priority_strategy(), 0..64)
        ) {
            let mut queue = PriorityQueue::new();
            for (id, priority) in priorities.iter().enumerate() {
                queue.push(job(id as u64, *priority));
            }

            let mut expected: Vec<(JobPriority, u64)> = priorities
                .iter()
                .enumerate()
                .map(|(id, p)| (*p, id as u64))
                .collect();
            expected.sort();

            let popped: Vec<(JobPriority, u64)> = std::iter::from_fn(|| queue.pop())
                .map(|j| (j.priority(), j.id().as_u64()))
                .collect();

            prop_assert_eq!(popped, expected);
        }
    }
}
