//! Transport contract
//!
//! A transport performs the network I/O for one task. It reports cumulative
//! progress through the [`ProgressReporter`] it is handed and resolves to the
//! result payload or an error. The worker owns everything else: turning the
//! result into a completion event, catching panics, and dropping the future
//! when the task is stopped.

use futures::future::BoxFuture;

use crate::app::models::Task;
use crate::errors::TransportResult;

use super::types::ProgressReporter;

/// Executes one task
pub trait Transport: Send + Sync + 'static {
    /// Run `task` to completion
    ///
    /// The returned future may be dropped at any await point when the task
    /// is cancelled, so implementations must not rely on running to the end
    /// for cleanup of shared state.
    fn execute<'a>(
        &'a self,
        task: &'a Task,
        progress: ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>>;

    /// Short name for logs
    fn name(&self) -> &'static str {
        "transport"
    }
}
