//! Prelude module for the request orchestrator library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use request_orchestrator::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use request_orchestrator::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let transport = Arc::new(HttpTransport::from_config(&ClientConfig::default())?);
//!     let orchestrator = Orchestrator::start(OrchestratorConfig::default(), transport)?;
//!
//!     let reply = orchestrator.submit(Task::get("https://example.com/")).await?;
//!     if let Some(delivery) = reply.finished().await {
//!         println!("{}", delivery.task.payload_text());
//!     }
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result, SubmitError, TransportError};

// Essential app components that are used in most integrations
pub use crate::app::{
    BatchId,
    BatchSnapshot,
    ClientConfig,
    Delivery,
    Direction,
    HttpTransport,
    Notification,
    // Core orchestration
    Orchestrator,
    OrchestratorConfig,
    OrchestratorStats,
    ProgressReporter,
    Reply,
    ReplyHandle,
    RequestId,
    RequestKind,
    SimulatedTransport,
    SimulationConfig,
    StopAllNotify,
    // Data types
    Task,
    Transport,
};

// Commonly used constants
pub use crate::constants::{MAX_CAPACITY, MIN_CAPACITY, USER_AGENT};

// Standard library re-exports that are commonly needed
pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

// Common external crate re-exports for convenience
pub use tokio;
