//! Worker event and progress types
//!
//! Workers never touch orchestrator state. Everything they have to say
//! travels as a [`WorkerEvent`] over the reactor's event channel.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::app::models::{BatchId, Direction, RequestId, Task};

/// Message from a worker (or the pool) to the reactor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// Cumulative transfer progress for one task
    Progress(ProgressReport),
    /// The task finished; `success` and `payload` carry the outcome
    Completed(Task),
    /// A pool slot was released after the reactor asked to be woken
    SlotReleased,
}

/// One cumulative progress report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub id: RequestId,
    pub batch: BatchId,
    pub direction: Direction,
    /// Bytes transferred so far
    pub bytes: u64,
    /// Expected bytes, 0 if unknown
    pub total: u64,
}

/// Handle given to a transport for reporting progress of its task
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    id: RequestId,
    batch: BatchId,
    events: mpsc::Sender<WorkerEvent>,
}

impl ProgressReporter {
    pub fn new(id: RequestId, batch: BatchId, events: mpsc::Sender<WorkerEvent>) -> Self {
        Self { id, batch, events }
    }

    /// Report cumulative download progress
    pub async fn download(&self, bytes: u64, total: u64) {
        self.report(Direction::Download, bytes, total).await;
    }

    /// Report cumulative upload progress
    pub async fn upload(&self, bytes: u64, total: u64) {
        self.report(Direction::Upload, bytes, total).await;
    }

    pub async fn report(&self, direction: Direction, bytes: u64, total: u64) {
        let report = ProgressReport {
            id: self.id,
            batch: self.batch,
            direction,
            bytes,
            total,
        };
        if self.events.send(WorkerEvent::Progress(report)).await.is_err() {
            debug!("Progress for request {} dropped, reactor gone", self.id);
        }
    }

    /// Report without waiting; the report is dropped if the channel is full
    ///
    /// For use from synchronous contexts such as a request body stream.
    pub fn try_report(&self, direction: Direction, bytes: u64, total: u64) {
        let report = ProgressReport {
            id: self.id,
            batch: self.batch,
            direction,
            bytes,
            total,
        };
        if self.events.try_send(WorkerEvent::Progress(report)).is_err() {
            debug!("Progress for request {} skipped, channel busy", self.id);
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reporter_tags_events() {
        let (tx, mut rx) = mpsc::channel(4);
        let reporter = ProgressReporter::new(RequestId(7), BatchId(2), tx);

        reporter.download(10, 100).await;
        reporter.upload(5, 50).await;

        assert_eq!(
            rx.recv().await,
            Some(WorkerEvent::Progress(ProgressReport {
                id: RequestId(7),
                batch: BatchId(2),
                direction: Direction::Download,
                bytes: 10,
                total: 100,
            }))
        );
        match rx.recv().await {
            Some(WorkerEvent::Progress(report)) => {
                assert_eq!(report.direction, Direction::Upload);
                assert_eq!(report.bytes, 5);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reporter_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let reporter = ProgressReporter::new(RequestId(1), BatchId::NONE, tx);
        reporter.download(1, 2).await;
    }
}
