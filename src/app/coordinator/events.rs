//! Messages into and out of the reactor

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::app::ledger::BatchSnapshot;
use crate::app::models::{BatchId, RequestId, Task};
use crate::app::reply::ReplyHandle;

use super::stats::OrchestratorStats;

/// Progress and completion signals published to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// Cumulative download progress of a task outside any batch
    DownloadProgress { id: RequestId, bytes: u64, total: u64 },
    /// Cumulative upload progress of a task outside any batch
    UploadProgress { id: RequestId, bytes: u64, total: u64 },
    /// Aggregate download bytes of a batch
    BatchDownloadProgress { batch: BatchId, bytes: u64 },
    /// Aggregate upload bytes of a batch
    BatchUploadProgress { batch: BatchId, bytes: u64 },
    /// Every member of the batch succeeded
    BatchFinished { batch: BatchId },
}

/// Requests from [`Orchestrator`](super::Orchestrator) handles
pub(crate) enum Command {
    Submit {
        task: Task,
        handle: Box<dyn ReplyHandle>,
    },
    SubmitBatch {
        batch: BatchId,
        tasks: Vec<Task>,
        handle: Box<dyn ReplyHandle>,
    },
    Stop(RequestId),
    StopBatch(BatchId),
    StopAll,
    SetCapacity {
        capacity: usize,
        reply: oneshot::Sender<bool>,
    },
    Capacity {
        reply: oneshot::Sender<usize>,
    },
    Stats {
        reply: oneshot::Sender<OrchestratorStats>,
    },
    BatchProgress {
        batch: BatchId,
        reply: oneshot::Sender<Option<BatchSnapshot>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Command {
    /// Short name for logs
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Submit { .. } => "submit",
            Command::SubmitBatch { .. } => "submit_batch",
            Command::Stop(_) => "stop",
            Command::StopBatch(_) => "stop_batch",
            Command::StopAll => "stop_all",
            Command::SetCapacity { .. } => "set_capacity",
            Command::Capacity { .. } => "capacity",
            Command::Stats { .. } => "stats",
            Command::BatchProgress { .. } => "batch_progress",
            Command::Shutdown { .. } => "shutdown",
        }
    }
}
