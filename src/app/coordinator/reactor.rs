//! The reactor: single owner of all orchestration state
//!
//! Commands from handles and events from workers arrive on two channels and
//! are applied one at a time. Nothing else reads or writes the queue, the
//! registry, the ledger, the router or the worker map, so none of them need
//! locking. Dispatch, completion handling and cancellation live in sibling
//! modules as further `impl Reactor` blocks.

use std::collections::HashMap;
use std::ops::ControlFlow;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::ledger::BatchLedger;
use crate::app::models::RequestId;
use crate::app::queue::{FailedOnceRegistry, WaitQueue};
use crate::app::reply::ReplyRouter;
use crate::app::worker::{WorkerEvent, WorkerHandle, WorkerPool};

use super::config::OrchestratorConfig;
use super::events::{Command, Notification};
use super::stats::{OrchestratorStats, OutcomeCounters};

pub(crate) struct Reactor {
    pub(super) config: OrchestratorConfig,
    pub(super) pool: WorkerPool,
    pub(super) queue: WaitQueue,
    pub(super) failed_once: FailedOnceRegistry,
    pub(super) ledger: BatchLedger,
    pub(super) router: ReplyRouter,
    pub(super) workers: HashMap<RequestId, WorkerHandle>,
    pub(super) stopped: bool,
    pub(super) outcomes: OutcomeCounters,
    notifications: broadcast::Sender<Notification>,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Receiver<WorkerEvent>,
    started_at: DateTime<Utc>,
}

impl Reactor {
    pub(crate) fn new(
        config: OrchestratorConfig,
        pool: WorkerPool,
        notifications: broadcast::Sender<Notification>,
        commands: mpsc::Receiver<Command>,
        events: mpsc::Receiver<WorkerEvent>,
    ) -> Self {
        Self {
            config,
            pool,
            queue: WaitQueue::new(),
            failed_once: FailedOnceRegistry::new(),
            ledger: BatchLedger::new(),
            router: ReplyRouter::new(),
            workers: HashMap::new(),
            stopped: false,
            outcomes: OutcomeCounters::default(),
            notifications,
            commands,
            events,
            started_at: Utc::now(),
        }
    }

    /// Process commands and events until shutdown or until every handle is gone
    pub(crate) async fn run(mut self) {
        info!("Reactor started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if let ControlFlow::Break(reply) = self.handle_command(command) {
                            self.shutdown().await;
                            let _ = reply.send(());
                            break;
                        }
                    }
                    None => {
                        debug!("All orchestrator handles dropped");
                        self.shutdown().await;
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }

        info!("Reactor stopped");
    }

    /// Apply one command; a shutdown request breaks out with its reply
    fn handle_command(&mut self, command: Command) -> ControlFlow<oneshot::Sender<()>> {
        debug!("Command: {}", command.name());
        match command {
            Command::Submit { task, handle } => self.submit(task, handle),
            Command::SubmitBatch {
                batch,
                tasks,
                handle,
            } => self.submit_batch(batch, tasks, handle),
            Command::Stop(id) => {
                self.stop(id);
                self.run_next();
            }
            Command::StopBatch(batch) => {
                self.stop_batch(batch);
                self.run_next();
            }
            Command::StopAll => {
                // Workers wind down on their own
                drop(self.stop_all());
            }
            Command::SetCapacity { capacity, reply } => {
                let accepted = self.pool.set_capacity(capacity);
                let _ = reply.send(accepted);
                if accepted {
                    self.run_next();
                }
            }
            Command::Capacity { reply } => {
                let _ = reply.send(self.pool.capacity());
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            Command::BatchProgress { batch, reply } => {
                let _ = reply.send(self.ledger.snapshot(batch));
            }
            Command::Shutdown { reply } => return ControlFlow::Break(reply),
        }
        ControlFlow::Continue(())
    }

    fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Completed(task) => self.on_completed(task),
            WorkerEvent::Progress(report) => self.on_progress(report),
            WorkerEvent::SlotReleased => {
                self.pool.wake_fired();
                self.run_next();
            }
        }
    }

    /// Publish to subscribers; having none is fine
    pub(super) fn notify(&self, notification: Notification) {
        if self.notifications.send(notification).is_err() {
            debug!("No subscribers for {:?}", notification);
        }
    }

    pub(super) fn stats(&self) -> OrchestratorStats {
        OrchestratorStats {
            active_workers: self.pool.active(),
            running: self.workers.len(),
            waiting: self.queue.len(),
            failed_once: self.failed_once.len(),
            open_batches: self.ledger.len(),
            pending_replies: self.router.single_count(),
            pending_batch_replies: self.router.batch_count(),
            pool_capacity: self.pool.capacity(),
            stopped: self.stopped,
            outcomes: self.outcomes,
            started_at: self.started_at,
        }
    }

    async fn shutdown(&mut self) {
        info!("Shutting down orchestrator: {}", self.stats().summary());
        let joins: Vec<JoinHandle<()>> = self.stop_all();
        if joins.is_empty() {
            return;
        }

        let timeout = self.config.shutdown_timeout;
        let drained = tokio::time::timeout(timeout, futures::future::join_all(joins)).await;
        match drained {
            Ok(results) => {
                let panicked = results.iter().filter(|r| r.is_err()).count();
                if panicked > 0 {
                    warn!("{} workers ended abnormally during shutdown", panicked);
                }
            }
            Err(_) => warn!("Workers did not stop within {:?}", timeout),
        }
    }
}
