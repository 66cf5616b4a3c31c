//! Reply router
//!
//! Maps request ids and batch ids to their reply handles. Single-task
//! handles are always removed on delivery. Batch handles stay registered
//! across non-destroying deliveries and are removed by the destroying one.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::app::models::{BatchId, RequestId, Task};

use super::ReplyHandle;

/// Registered reply handles
#[derive(Default)]
pub struct ReplyRouter {
    // Ordered so the most recent request is the last entry
    singles: BTreeMap<RequestId, Box<dyn ReplyHandle>>,
    batches: HashMap<BatchId, Box<dyn ReplyHandle>>,
}

impl std::fmt::Debug for ReplyRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyRouter")
            .field("singles", &self.singles.keys().collect::<Vec<_>>())
            .field("batches", &self.batches.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ReplyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_single(&mut self, id: RequestId, handle: Box<dyn ReplyHandle>) {
        self.singles.insert(id, handle);
    }

    pub fn register_batch(&mut self, batch: BatchId, handle: Box<dyn ReplyHandle>) {
        self.batches.insert(batch, handle);
    }

    /// Deliver the terminal result of a non-batch task
    ///
    /// Returns `false` if no handle is registered for the task's id.
    pub fn deliver_single(&mut self, task: &Task) -> bool {
        match self.singles.remove(&task.id) {
            Some(mut handle) => {
                handle.deliver(task, true);
                true
            }
            None => {
                debug!("No reply registered for request {}", task.id);
                false
            }
        }
    }

    /// Deliver a batch member's result to the batch handle
    ///
    /// A destroying delivery also unregisters the handle.
    pub fn deliver_batch(&mut self, task: &Task, destroying: bool) -> bool {
        let batch = task.batch_id;
        if destroying {
            match self.batches.remove(&batch) {
                Some(mut handle) => {
                    handle.deliver(task, true);
                    true
                }
                None => {
                    debug!("No reply registered for batch {}", batch);
                    false
                }
            }
        } else {
            match self.batches.get_mut(&batch) {
                Some(handle) => {
                    handle.deliver(task, false);
                    true
                }
                None => {
                    debug!("No reply registered for batch {}", batch);
                    false
                }
            }
        }
    }

    pub fn has_single(&self, id: RequestId) -> bool {
        self.singles.contains_key(&id)
    }

    pub fn has_batch(&self, batch: BatchId) -> bool {
        self.batches.contains_key(&batch)
    }

    /// Unregister and return the handle with the highest request id
    pub fn take_latest_single(&mut self) -> Option<(RequestId, Box<dyn ReplyHandle>)> {
        self.singles.pop_last()
    }

    /// Unregister and return every single-task handle, oldest first
    pub fn take_singles(&mut self) -> Vec<(RequestId, Box<dyn ReplyHandle>)> {
        std::mem::take(&mut self.singles).into_iter().collect()
    }

    /// Unregister and return every batch handle
    pub fn take_batches(&mut self) -> Vec<(BatchId, Box<dyn ReplyHandle>)> {
        self.batches.drain().collect()
    }

    pub fn single_count(&self) -> usize {
        self.singles.len()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Drop every handle without delivering anything
    pub fn clear(&mut self) {
        self.singles.clear();
        self.batches.clear();
    }
}
