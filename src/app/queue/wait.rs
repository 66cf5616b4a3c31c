//! FIFO wait queue
//!
//! Insertion order is admission order. There is no priority: the only
//! reordering is removal of cancelled entries.

use std::collections::VecDeque;

use crate::app::models::{BatchId, RequestId, Task};

/// Tasks waiting for a worker slot
#[derive(Debug, Default)]
pub struct WaitQueue {
    tasks: VecDeque<Task>,
}

impl WaitQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a task at the tail
    pub fn push_back(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    /// Return a task to the head, ahead of everything admitted after it
    pub fn push_front(&mut self, task: Task) {
        self.tasks.push_front(task);
    }

    /// Take the oldest task
    pub fn pop_front(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Remove the entry for `id`, if queued
    pub fn remove_request(&mut self, id: RequestId) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        self.tasks.remove(index)
    }

    /// Remove and return every entry belonging to `batch`
    ///
    /// The remaining entries keep their order.
    pub fn remove_batch(&mut self, batch: BatchId) -> Vec<Task> {
        let (removed, kept): (VecDeque<Task>, VecDeque<Task>) = std::mem::take(&mut self.tasks)
            .into_iter()
            .partition(|task| task.batch_id == batch);
        self.tasks = kept;
        removed.into_iter().collect()
    }

    /// Whether a task with `id` is waiting
    pub fn contains(&self, id: RequestId) -> bool {
        self.tasks.iter().any(|task| task.id == id)
    }

    /// Request ids in queue order
    pub fn ids(&self) -> Vec<RequestId> {
        self.tasks.iter().map(|task| task.id).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop every waiting task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
