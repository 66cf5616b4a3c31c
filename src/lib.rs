//! Request Orchestrator Library
//!
//! A Rust library for running network requests through a bounded worker
//! pool, with FIFO admission, one automatic retry, batch progress
//! aggregation and cancellation at request, batch or global scope.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
