//! Admission and the dispatch loop
//!
//! A single task starts at once only when a slot is free and nobody is
//! waiting; otherwise it joins the tail of the wait queue. Batch members
//! always go through the queue. [`Reactor::run_next`] drains the queue into
//! free slots and arms a pool wake whenever it has to stop early.

use tracing::{debug, info, warn};

use crate::app::models::{validate_locator, BatchId, Task};
use crate::app::reply::ReplyHandle;
use crate::constants::messages;

use super::reactor::Reactor;

impl Reactor {
    /// A fresh submission re-arms a stopped orchestrator
    fn resume(&mut self) {
        if self.stopped {
            info!("New submission after stop_all, resuming dispatch");
            self.stopped = false;
        }
    }

    pub(super) fn submit(&mut self, task: Task, handle: Box<dyn ReplyHandle>) {
        self.resume();
        debug!("Admitting request {} ({})", task.id, task.locator);
        self.router.register_single(task.id, handle);

        if self.pool.has_free_slot() && self.queue.is_empty() {
            self.start(task);
        } else {
            self.queue.push_back(task);
        }
        self.run_next();
    }

    pub(super) fn submit_batch(
        &mut self,
        batch: BatchId,
        tasks: Vec<Task>,
        handle: Box<dyn ReplyHandle>,
    ) {
        self.resume();
        info!("Admitting batch {} with {} tasks", batch, tasks.len());
        self.ledger.open(batch, tasks.len());
        self.router.register_batch(batch, handle);

        for task in tasks {
            self.queue.push_back(task);
        }
        self.run_next();
    }

    /// Move waiting tasks onto free slots
    pub(super) fn run_next(&mut self) {
        loop {
            if self.stopped {
                return;
            }

            if self.queue.is_empty() {
                self.settle_idle();
                return;
            }

            if !self.pool.has_free_slot() {
                self.pool.arm_wake();
                return;
            }

            let Some(mut task) = self.queue.pop_front() else {
                return;
            };

            if validate_locator(&task.locator).is_err() {
                debug!("Request {} has an invalid locator, failing it", task.id);
                task.fail_with(messages::invalid_locator(&task.locator));
                self.finish_task(task);
                continue;
            }

            if !self.start(task) {
                self.pool.arm_wake();
                return;
            }
        }
    }

    /// Queue is empty: forget retry history once fully idle, or make sure
    /// the loop runs again when the last busy slot frees up
    fn settle_idle(&mut self) {
        let active = self.pool.active();
        if active == 0 && self.workers.is_empty() {
            if !self.failed_once.is_empty() {
                debug!("Idle, clearing {} failed-once entries", self.failed_once.len());
                self.failed_once.clear();
            }
        } else if active == 1 || self.workers.is_empty() {
            // With no registered workers, the remaining slots belong to
            // stopped workers still unwinding; wake once they let go
            self.pool.arm_wake();
        }
    }

    /// Hand `task` to the pool; a saturated pool puts it back at the head
    pub(super) fn start(&mut self, task: Task) -> bool {
        match self.pool.try_start(task) {
            Ok(handle) => {
                self.workers.insert(handle.request_id(), handle);
                true
            }
            Err(task) => {
                warn!("Pool saturated, request {} returned to the queue", task.id);
                self.queue.push_front(task);
                false
            }
        }
    }
}
