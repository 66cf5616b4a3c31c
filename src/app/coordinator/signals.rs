//! Signal handling
//!
//! Ctrl-C or SIGTERM cancels all outstanding work through `stop_all`, so
//! callers waiting on replies are released instead of hanging.

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::Orchestrator;

/// Stops the orchestrator when the process is interrupted
pub struct SignalHandler {
    orchestrator: Orchestrator,
}

impl SignalHandler {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    /// Spawn the watcher task
    ///
    /// The task ends after the first signal, once `stop_all` has been sent.
    pub fn setup(&self) -> JoinHandle<()> {
        let orchestrator = self.orchestrator.clone();

        tokio::spawn(async move {
            wait_for_signal().await;
            info!("Interrupted, stopping all requests");
            orchestrator.stop_all().await;
        })
    }
}

/// Wait for Ctrl-C or, on unix, SIGTERM
pub async fn wait_for_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl+C signal received"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("SIGTERM signal received");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::{SimulatedTransport, SimulationConfig};
    use crate::app::coordinator::OrchestratorConfig;
    use std::sync::Arc;
    use std::time::Duration;

    /// Installing the handler must not stop anything by itself
    #[tokio::test]
    async fn test_signal_handler_setup() {
        let orchestrator = Orchestrator::start(
            OrchestratorConfig::default(),
            Arc::new(SimulatedTransport::new(SimulationConfig::default())),
        )
        .unwrap();

        let handle = SignalHandler::new(orchestrator.clone()).setup();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        let stats = orchestrator.stats().await.unwrap();
        assert!(!stats.stopped);

        handle.abort();
        orchestrator.shutdown().await;
    }
}
