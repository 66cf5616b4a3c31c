//! Request orchestration
//!
//! This module provides the control plane: it admits tasks and batches,
//! bounds how many run at once, retries failures once, aggregates batch
//! progress, and cancels at request, batch or global scope.
//!
//! # Key Features
//!
//! - **Single writer**: all state lives in one reactor task; handles talk
//!   to it over channels, so there is no shared-state locking
//! - **FIFO admission**: a task starts immediately only if a slot is free
//!   and nobody is waiting ahead of it
//! - **One retry**: a failed task with retries enabled runs once more
//! - **Batches**: one reply per batch, intermediate deliveries per member,
//!   one terminal delivery on completion, abort or cancellation
//! - **Notifications**: progress and batch completion are broadcast to any
//!   number of subscribers
//!
//! # Architecture
//!
//! - [`config`] - Configuration structures and validation
//! - [`events`] - Commands into and notifications out of the reactor
//! - `reactor` - Event loop owning all state
//! - `dispatch` - Admission and the dispatch loop
//! - `completion` - Retry policy, reply routing, progress aggregation
//! - `cancel` - stop, stop_batch, stop_all
//! - [`stats`] - State snapshots
//! - [`signals`] - Ctrl-C / SIGTERM handling
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use request_orchestrator::app::client::{HttpTransport, ClientConfig};
//! use request_orchestrator::app::coordinator::{Orchestrator, OrchestratorConfig};
//! use request_orchestrator::app::models::Task;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::from_config(&ClientConfig::default())?);
//! let orchestrator = Orchestrator::start(OrchestratorConfig::default(), transport)?;
//!
//! let reply = orchestrator.submit(Task::get("https://example.com/")).await?;
//! if let Some(delivery) = reply.finished().await {
//!     println!("success: {}", delivery.task.success);
//! }
//!
//! orchestrator.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod cancel;
mod completion;
pub mod config;
mod dispatch;
pub mod events;
mod reactor;
pub mod signals;
pub mod stats;

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::app::ids::IdAllocator;
use crate::app::ledger::BatchSnapshot;
use crate::app::models::{validate_locator, BatchId, RequestId, Task};
use crate::app::reply::{ChannelReply, Reply, ReplyHandle, ReplyTarget};
use crate::app::worker::{Transport, WorkerPool};
use crate::errors::{ConfigError, ConfigResult, SubmitError, SubmitResult};

use events::Command;
use reactor::Reactor;

pub use config::{OrchestratorConfig, StopAllNotify};
pub use events::Notification;
pub use signals::SignalHandler;
pub use stats::{OrchestratorStats, OutcomeCounters};

/// Cloneable handle to a running orchestrator
///
/// The reactor runs until [`Orchestrator::shutdown`] is called or every
/// handle has been dropped.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    commands: mpsc::Sender<Command>,
    notifications: broadcast::Sender<Notification>,
    ids: Arc<IdAllocator>,
}

impl Orchestrator {
    /// Spawn the reactor on the current tokio runtime
    pub fn start(config: OrchestratorConfig, transport: Arc<dyn Transport>) -> ConfigResult<Self> {
        config.validate().map_err(|reason| ConfigError::InvalidValue {
            field: "orchestrator".to_string(),
            value: format!("{:?}", config),
            reason,
        })?;

        let (command_tx, command_rx) = mpsc::channel(config.event_buffer_size);
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer_size);
        let (notification_tx, _) = broadcast::channel(config.notification_buffer_size);

        let pool = WorkerPool::new(config.effective_capacity(), transport, event_tx);
        let reactor = Reactor::new(config, pool, notification_tx.clone(), command_rx, event_rx);
        tokio::spawn(reactor.run());

        Ok(Self {
            commands: command_tx,
            notifications: notification_tx,
            ids: Arc::new(IdAllocator::new()),
        })
    }

    /// Subscribe to progress and batch-completion notifications
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Submit one task and get a reply to await its result
    ///
    /// Fails without allocating an id if the locator is empty or malformed.
    pub async fn submit(&self, task: Task) -> SubmitResult<Reply> {
        validate_locator(&task.locator)?;
        let id = self.ids.new_request_id();
        let (handle, reply) = ChannelReply::pair(ReplyTarget::Request(id));
        self.enqueue_single(task, id, Box::new(handle)).await?;
        Ok(reply)
    }

    /// Submit one task with a caller-supplied reply handle
    pub async fn submit_with_handle(
        &self,
        task: Task,
        handle: Box<dyn ReplyHandle>,
    ) -> SubmitResult<RequestId> {
        validate_locator(&task.locator)?;
        let id = self.ids.new_request_id();
        self.enqueue_single(task, id, handle).await?;
        Ok(id)
    }

    /// Submit tasks as one batch sharing a single reply
    ///
    /// Member locators are checked when each member is dispatched; an
    /// invalid one fails like any other transfer.
    pub async fn submit_batch(&self, tasks: Vec<Task>) -> SubmitResult<(Reply, BatchId)> {
        if tasks.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }
        let batch = self.ids.new_batch_id();
        let (handle, reply) = ChannelReply::pair(ReplyTarget::Batch(batch));
        self.enqueue_batch(tasks, batch, Box::new(handle)).await?;
        Ok((reply, batch))
    }

    /// Submit a batch with a caller-supplied reply handle
    pub async fn submit_batch_with_handle(
        &self,
        tasks: Vec<Task>,
        handle: Box<dyn ReplyHandle>,
    ) -> SubmitResult<BatchId> {
        if tasks.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }
        let batch = self.ids.new_batch_id();
        self.enqueue_batch(tasks, batch, handle).await?;
        Ok(batch)
    }

    /// Cancel one request, running or waiting
    pub async fn stop(&self, id: RequestId) {
        self.fire(Command::Stop(id)).await;
    }

    /// Cancel every member of a batch
    pub async fn stop_batch(&self, batch: BatchId) {
        self.fire(Command::StopBatch(batch)).await;
    }

    /// Cancel everything; the next submission resumes dispatch
    pub async fn stop_all(&self) {
        self.fire(Command::StopAll).await;
    }

    /// Change the pool capacity; only 1..=8 is accepted
    pub async fn set_pool_capacity(&self, capacity: usize) -> bool {
        self.query(|reply| Command::SetCapacity { capacity, reply })
            .await
            .unwrap_or(false)
    }

    pub async fn pool_capacity(&self) -> SubmitResult<usize> {
        self.query(|reply| Command::Capacity { reply }).await
    }

    pub async fn stats(&self) -> SubmitResult<OrchestratorStats> {
        self.query(|reply| Command::Stats { reply }).await
    }

    /// Ledger snapshot of an open batch
    pub async fn batch_progress(&self, batch: BatchId) -> SubmitResult<Option<BatchSnapshot>> {
        self.query(|reply| Command::BatchProgress { batch, reply }).await
    }

    /// Stop all work, wait for workers, and end the reactor
    pub async fn shutdown(&self) {
        if self.query(|reply| Command::Shutdown { reply }).await.is_err() {
            debug!("Orchestrator already shut down");
        }
    }

    /// Whether the reactor is still accepting commands
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn enqueue_single(
        &self,
        mut task: Task,
        id: RequestId,
        handle: Box<dyn ReplyHandle>,
    ) -> SubmitResult<()> {
        task.id = id;
        task.batch_id = BatchId::NONE;
        task.success = false;
        task.payload.clear();
        self.send(Command::Submit { task, handle }).await
    }

    async fn enqueue_batch(
        &self,
        tasks: Vec<Task>,
        batch: BatchId,
        handle: Box<dyn ReplyHandle>,
    ) -> SubmitResult<()> {
        let tasks = tasks
            .into_iter()
            .map(|mut task| {
                task.id = self.ids.new_request_id();
                task.batch_id = batch;
                task.success = false;
                task.payload.clear();
                task
            })
            .collect();
        self.send(Command::SubmitBatch {
            batch,
            tasks,
            handle,
        })
        .await
    }

    async fn send(&self, command: Command) -> SubmitResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SubmitError::Closed)
    }

    async fn fire(&self, command: Command) {
        let name = command.name();
        if self.send(command).await.is_err() {
            debug!("Orchestrator closed, {} ignored", name);
        }
    }

    async fn query<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> SubmitResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await.map_err(|_| SubmitError::Closed)
    }
}

#[cfg(test)]
mod tests;
