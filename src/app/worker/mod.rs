//! Task execution on a bounded pool
//!
//! This module connects the orchestrator to the transports that do the
//! actual network I/O.
//!
//! # Features
//!
//! - **Bounded concurrency**: [`WorkerPool`] never runs more than its
//!   capacity, adjustable at runtime within 1..=8
//! - **Cooperative cancellation**: each worker races its transport against a
//!   private shutdown channel
//! - **Crash containment**: transport errors and panics become failed
//!   completions, so the reactor always gets an answer
//! - **Event channel**: progress and completions flow to the reactor as
//!   [`WorkerEvent`]s; workers share no state with it
//!
//! # Writing a transport
//!
//! ```rust,no_run
//! use futures::future::BoxFuture;
//! use request_orchestrator::app::models::Task;
//! use request_orchestrator::app::worker::{ProgressReporter, Transport};
//! use request_orchestrator::errors::TransportResult;
//!
//! struct Loopback;
//!
//! impl Transport for Loopback {
//!     fn execute<'a>(
//!         &'a self,
//!         task: &'a Task,
//!         progress: ProgressReporter,
//!     ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
//!         Box::pin(async move {
//!             let body = task.locator.clone().into_bytes();
//!             progress.download(body.len() as u64, body.len() as u64).await;
//!             Ok(body)
//!         })
//!     }
//! }
//! ```

pub mod core;
pub mod pool;
pub mod transport;
pub mod types;

pub use pool::{default_capacity, is_valid_capacity, WorkerHandle, WorkerPool};
pub use transport::Transport;
pub use types::{ProgressReport, ProgressReporter, WorkerEvent};
