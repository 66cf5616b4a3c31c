//! Per-task worker
//!
//! A [`TaskWorker`] runs exactly one task on the tokio runtime. It races the
//! transport future against its shutdown channel; on shutdown the transport
//! future is dropped and nothing more is reported. Otherwise the outcome,
//! including a panic inside the transport, becomes one completion event.
//!
//! The pool slot is released only after the completion has been queued for
//! the reactor, so the reactor always sees the completion while the slot is
//! still counted as busy.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::app::models::Task;
use crate::errors::TransportError;

use super::pool::SlotGuard;
use super::transport::Transport;
use super::types::{ProgressReporter, WorkerEvent};

/// Executes one task and reports its completion
pub struct TaskWorker {
    task: Task,
    transport: Arc<dyn Transport>,
    events: mpsc::Sender<WorkerEvent>,
    shutdown_rx: mpsc::Receiver<()>,
    slot: SlotGuard,
}

impl TaskWorker {
    pub(crate) fn new(
        task: Task,
        transport: Arc<dyn Transport>,
        events: mpsc::Sender<WorkerEvent>,
        shutdown_rx: mpsc::Receiver<()>,
        slot: SlotGuard,
    ) -> Self {
        Self {
            task,
            transport,
            events,
            shutdown_rx,
            slot,
        }
    }

    /// Run the task until it completes or is told to quit
    pub async fn run(mut self) {
        let id = self.task.id;
        debug!(
            "Worker for request {} starting via {}",
            id,
            self.transport.name()
        );

        let reporter = ProgressReporter::new(id, self.task.batch_id, self.events.clone());
        let outcome = {
            let execution =
                AssertUnwindSafe(self.transport.execute(&self.task, reporter)).catch_unwind();

            tokio::select! {
                biased;
                // A closed channel means the owner is gone; treat it as quit too
                _ = self.shutdown_rx.recv() => None,
                result = execution => Some(result),
            }
        };

        let Some(outcome) = outcome else {
            debug!("Worker for request {} stopped before completion", id);
            return;
        };

        match outcome {
            Ok(Ok(payload)) => {
                debug!("Request {} succeeded ({} bytes)", id, payload.len());
                self.task.succeed_with(payload);
            }
            Ok(Err(error)) => {
                debug!("Request {} failed: {}", id, error);
                self.task.fail_with(error.to_string());
            }
            Err(panic) => {
                let error = TransportError::Panicked {
                    message: panic_message(panic.as_ref()),
                };
                warn!("Request {}: {}", id, error);
                self.task.fail_with(error.to_string());
            }
        }

        if self
            .events
            .send(WorkerEvent::Completed(self.task))
            .await
            .is_err()
        {
            debug!("Completion for request {} dropped, reactor gone", id);
        }

        drop(self.slot);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
