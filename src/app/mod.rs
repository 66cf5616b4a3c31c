//! Core application logic for the request orchestrator
//!
//! This module contains the orchestration components: task models and
//! identities, the wait queue and retry registry, the batch ledger, reply
//! routing, the worker pool, the transports, and the reactor that ties
//! them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use request_orchestrator::app::{Orchestrator, OrchestratorConfig, SimulatedTransport, SimulationConfig, Task};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(SimulatedTransport::new(SimulationConfig::default()));
//! let orchestrator = Orchestrator::start(OrchestratorConfig::default(), transport)?;
//!
//! let tasks = (0..4)
//!     .map(|i| Task::get(format!("https://example.com/item/{}", i)))
//!     .collect();
//! let (reply, batch) = orchestrator.submit_batch(tasks).await?;
//!
//! if let Some(delivery) = reply.finished().await {
//!     println!("batch {} done, success: {}", batch, delivery.task.success);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod coordinator;
pub mod ids;
pub mod ledger;
pub mod models;
pub mod queue;
pub mod reply;
pub mod worker;

// Re-export main public API
pub use client::{ClientConfig, HttpTransport, SimulatedTransport, SimulationConfig};
pub use coordinator::{
    Notification, Orchestrator, OrchestratorConfig, OrchestratorStats, SignalHandler,
    StopAllNotify,
};
pub use ids::IdAllocator;
pub use ledger::{BatchLedger, BatchSnapshot};
pub use models::{BatchId, Direction, RequestId, RequestKind, Task};
pub use queue::{FailedOnceRegistry, WaitQueue};
pub use reply::{ChannelReply, Delivery, Reply, ReplyHandle, ReplyTarget};
pub use worker::{ProgressReporter, Transport};
