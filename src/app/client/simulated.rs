//! Simulated transport
//!
//! Stands in for the network: each task sleeps for a random latency split
//! into a few progress steps, then succeeds or fails at a configured rate.
//! Used by the `simulate` command and handy for exercising retry and batch
//! policy without a server.

use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::app::models::{Direction, RequestKind, Task};
use crate::app::worker::{ProgressReporter, Transport};
use crate::constants::simulation;
use crate::errors::{TransportError, TransportResult};

/// Simulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Shortest simulated transfer
    #[serde(with = "humantime_serde")]
    pub min_latency: Duration,
    /// Longest simulated transfer
    #[serde(with = "humantime_serde")]
    pub max_latency: Duration,
    /// Probability in [0, 1] that an attempt fails
    pub failure_rate: f64,
    /// Progress reports per transfer
    pub progress_steps: u32,
    /// Simulated transfer size in bytes
    pub payload_bytes: u64,
    /// Seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_latency: Duration::from_millis(simulation::MIN_LATENCY_MS),
            max_latency: Duration::from_millis(simulation::MAX_LATENCY_MS),
            failure_rate: simulation::FAILURE_RATE,
            progress_steps: simulation::PROGRESS_STEPS,
            payload_bytes: simulation::PAYLOAD_BYTES,
            seed: None,
        }
    }
}

impl SimulationConfig {
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate;
        self
    }

    pub fn with_latency(mut self, min: Duration, max: Duration) -> Self {
        self.min_latency = min;
        self.max_latency = max;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.failure_rate) {
            return Err(format!(
                "failure_rate must be within [0, 1], got {}",
                self.failure_rate
            ));
        }
        if self.min_latency > self.max_latency {
            return Err("min_latency must not exceed max_latency".to_string());
        }
        if self.progress_steps == 0 {
            return Err("progress_steps must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Transport that fakes transfers
#[derive(Debug)]
pub struct SimulatedTransport {
    config: SimulationConfig,
    rng: Mutex<fastrand::Rng>,
}

impl SimulatedTransport {
    pub fn new(config: SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Draw latency and outcome for one attempt
    fn roll(&self) -> (Duration, bool) {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let min = self.config.min_latency.as_millis() as u64;
        let max = self.config.max_latency.as_millis() as u64;
        let latency = Duration::from_millis(rng.u64(min..=max));
        let fails = rng.f64() < self.config.failure_rate;
        (latency, fails)
    }
}

impl Transport for SimulatedTransport {
    fn execute<'a>(
        &'a self,
        task: &'a Task,
        progress: ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            let (latency, fails) = self.roll();
            let direction = match task.kind {
                RequestKind::Upload { .. } => Direction::Upload,
                _ => Direction::Download,
            };

            let steps = self.config.progress_steps.max(1);
            let step_delay = latency / steps;
            let total = self.config.payload_bytes;

            for step in 1..=steps {
                tokio::time::sleep(step_delay).await;
                // Failing attempts stall halfway
                if fails && step * 2 > steps {
                    break;
                }
                progress
                    .report(direction, total * step as u64 / steps as u64, total)
                    .await;
            }

            if fails {
                return Err(TransportError::Simulated {
                    reason: format!("transfer of {} interrupted", task.locator),
                });
            }

            Ok(format!("simulated {} bytes from {}", total, task.locator).into_bytes())
        })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}
