//! Cancellation at request, batch and global scope
//!
//! All three operations tolerate state that is already gone. Workers are
//! told to quit and forgotten at once; any event they still manage to send
//! is ignored because their request id is no longer registered.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::models::{BatchId, RequestId, RequestKind, Task};
use crate::constants::messages;

use super::config::StopAllNotify;
use super::reactor::Reactor;

/// Failed task carrying a cancellation message
fn cancellation(mut task: Task, message: String) -> Task {
    task.fail_with(message);
    task
}

/// Placeholder task for a reply whose task copy is gone
fn detached(id: RequestId, batch: BatchId) -> Task {
    let mut task = Task::new(String::new(), RequestKind::Get);
    task.id = id;
    task.batch_id = batch;
    task
}

impl Reactor {
    pub(super) fn stop(&mut self, id: RequestId) {
        let running = self.workers.remove(&id).map(|worker| {
            let task = worker.task().clone();
            drop(worker.stop());
            task
        });
        let waiting = self.queue.remove_request(id);
        self.failed_once.remove(id);

        let known = running.or(waiting);
        if known.is_some() {
            self.outcomes.cancelled += 1;
        }

        if self.router.has_single(id) {
            let task = known.unwrap_or_else(|| detached(id, BatchId::NONE));
            let task = cancellation(task, messages::canceled_request(id.0));
            self.router.deliver_single(&task);
            info!("Request {} cancelled", id);
        } else {
            debug!("Stop for request {}: no reply outstanding", id);
        }
    }

    pub(super) fn stop_batch(&mut self, batch: BatchId) {
        let running: Vec<RequestId> = self
            .workers
            .values()
            .filter(|worker| worker.batch_id() == batch)
            .map(|worker| worker.request_id())
            .collect();

        for id in &running {
            if let Some(worker) = self.workers.remove(id) {
                drop(worker.stop());
            }
            self.failed_once.remove(*id);
        }

        let waiting = self.queue.remove_batch(batch);
        for task in &waiting {
            self.failed_once.remove(task.id);
        }
        self.outcomes.cancelled += (running.len() + waiting.len()) as u64;

        self.ledger.remove(batch);

        if self.router.has_batch(batch) {
            let task = cancellation(
                detached(RequestId::default(), batch),
                messages::canceled_batch(batch.0),
            );
            self.router.deliver_batch(&task, true);
            info!(
                "Batch {} cancelled ({} running, {} waiting)",
                batch,
                running.len(),
                waiting.len()
            );
        } else {
            debug!("Stop for batch {}: no reply outstanding", batch);
        }
    }

    /// Tear everything down and raise the global stop flag
    ///
    /// Returns the join handles of the workers told to quit. A second call
    /// while stopped does nothing.
    pub(super) fn stop_all(&mut self) -> Vec<JoinHandle<()>> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;

        let joins: Vec<JoinHandle<()>> = self
            .workers
            .drain()
            .map(|(_, worker)| worker.stop())
            .collect();
        self.outcomes.cancelled += (joins.len() + self.queue.len()) as u64;

        match self.config.stop_all_notify {
            StopAllNotify::Latest => {
                if let Some((id, mut handle)) = self.router.take_latest_single() {
                    let task = cancellation(
                        detached(id, BatchId::NONE),
                        messages::CANCELED_ALL.to_string(),
                    );
                    handle.deliver(&task, true);
                }
            }
            StopAllNotify::All => {
                for (id, mut handle) in self.router.take_singles() {
                    let task = cancellation(
                        detached(id, BatchId::NONE),
                        messages::CANCELED_ALL.to_string(),
                    );
                    handle.deliver(&task, true);
                }
                for (batch, mut handle) in self.router.take_batches() {
                    let task = cancellation(
                        detached(RequestId::default(), batch),
                        messages::CANCELED_ALL.to_string(),
                    );
                    handle.deliver(&task, true);
                }
            }
        }

        info!(
            "Stopped all requests ({} running, {} waiting, {} replies dropped)",
            joins.len(),
            self.queue.len(),
            self.router.single_count() + self.router.batch_count()
        );

        self.router.clear();
        self.queue.clear();
        self.failed_once.clear();
        self.ledger.clear();
        joins
    }
}
