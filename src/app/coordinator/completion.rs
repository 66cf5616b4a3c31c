//! Completion and progress handling
//!
//! A failed task gets one more attempt if it allows retries and has not
//! failed before. Everything else is terminal and routed to its reply:
//! single tasks always destroy their reply; batch members advance or abort
//! their batch.

use tracing::{debug, info};

use crate::app::ledger::BatchCompletion;
use crate::app::models::{Direction, Task};
use crate::app::worker::ProgressReport;

use super::events::Notification;
use super::reactor::Reactor;

impl Reactor {
    pub(super) fn on_completed(&mut self, task: Task) {
        if self.stopped {
            debug!("Stopped, ignoring completion of request {}", task.id);
            return;
        }
        if self.workers.remove(&task.id).is_none() {
            debug!("Ignoring completion from stopped request {}", task.id);
            return;
        }

        self.finish_task(task);
        self.run_next();
    }

    /// Apply retry policy, then route terminal outcomes
    pub(super) fn finish_task(&mut self, mut task: Task) {
        if !task.success {
            if task.retry_on_failure && self.failed_once.record(task.id) {
                info!("Request {} failed, retrying once: {}", task.id, task.payload_text());
                self.outcomes.retried += 1;
                task.payload.clear();
                self.queue.push_back(task);
                return;
            }
            self.failed_once.remove(task.id);
        }

        if task.success {
            self.outcomes.succeeded += 1;
        } else {
            info!("Request {} failed: {}", task.id, task.payload_text());
            self.outcomes.failed += 1;
        }

        self.route(task);
    }

    fn route(&mut self, task: Task) {
        if !task.in_batch() {
            self.router.deliver_single(&task);
            return;
        }

        let batch = task.batch_id;
        if task.success {
            match self.ledger.record_success(batch) {
                BatchCompletion::Complete => {
                    info!("Batch {} finished", batch);
                    self.notify(Notification::BatchFinished { batch });
                    self.router.deliver_batch(&task, true);
                }
                BatchCompletion::InProgress { finished, total } => {
                    debug!("Batch {}: {}/{} finished", batch, finished, total);
                    self.router.deliver_batch(&task, false);
                }
                BatchCompletion::Unknown => {
                    debug!("Batch {} no longer tracked", batch);
                }
            }
        } else if task.abort_batch_on_failure {
            info!("Request {} aborts batch {}", task.id, batch);
            self.router.deliver_batch(&task, true);
            self.stop_batch(batch);
        } else {
            self.router.deliver_batch(&task, false);
        }
    }

    pub(super) fn on_progress(&mut self, report: ProgressReport) {
        if self.stopped || !self.workers.contains_key(&report.id) {
            return;
        }
        if report.bytes == 0 || report.total == 0 {
            return;
        }

        if report.batch.is_none() {
            let notification = match report.direction {
                Direction::Download => Notification::DownloadProgress {
                    id: report.id,
                    bytes: report.bytes,
                    total: report.total,
                },
                Direction::Upload => Notification::UploadProgress {
                    id: report.id,
                    bytes: report.bytes,
                    total: report.total,
                },
            };
            self.notify(notification);
            return;
        }

        let Some(aggregate) =
            self.ledger
                .update_progress(report.batch, report.id, report.direction, report.bytes)
        else {
            return;
        };

        let notification = match report.direction {
            Direction::Download => Notification::BatchDownloadProgress {
                batch: report.batch,
                bytes: aggregate,
            },
            Direction::Upload => Notification::BatchUploadProgress {
                batch: report.batch,
                bytes: aggregate,
            },
        };
        self.notify(notification);
    }
}
