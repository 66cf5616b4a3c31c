//! Configuration structures for the orchestrator

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::worker::{default_capacity, is_valid_capacity};
use crate::constants::{channels, pool, SHUTDOWN_TIMEOUT};

/// Which replies receive a cancellation when everything is stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopAllNotify {
    /// Only the most recent single-task reply is told; the rest are dropped
    #[default]
    Latest,
    /// Every outstanding single-task and batch reply is told
    All,
}

/// Configuration for the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Worker pool capacity; `None` uses hardware concurrency within 1..=8
    pub pool_capacity: Option<usize>,
    /// Buffer for commands and worker events flowing into the reactor
    pub event_buffer_size: usize,
    /// Buffer for broadcast notifications; slow subscribers lag past this
    pub notification_buffer_size: usize,
    /// Cancellation scope of `stop_all`
    pub stop_all_notify: StopAllNotify,
    /// Maximum time to wait for workers on shutdown
    pub shutdown_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pool_capacity: None,
            event_buffer_size: channels::EVENT_BUFFER_SIZE,
            notification_buffer_size: channels::NOTIFICATION_BUFFER_SIZE,
            stop_all_notify: StopAllNotify::default(),
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

impl OrchestratorConfig {
    /// Use a fixed pool capacity
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = Some(capacity);
        self
    }

    /// Set the stop-all notification scope
    pub fn with_stop_all_notify(mut self, notify: StopAllNotify) -> Self {
        self.stop_all_notify = notify;
        self
    }

    /// Set the notification buffer size
    pub fn with_notification_buffer(mut self, size: usize) -> Self {
        self.notification_buffer_size = size;
        self
    }

    /// Set shutdown timeout
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Capacity the pool starts with
    pub fn effective_capacity(&self) -> usize {
        self.pool_capacity.unwrap_or_else(default_capacity)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(capacity) = self.pool_capacity {
            if !is_valid_capacity(capacity) {
                return Err(format!(
                    "Pool capacity must be between {} and {}, got {}",
                    pool::MIN_CAPACITY,
                    pool::MAX_CAPACITY,
                    capacity
                ));
            }
        }

        if self.event_buffer_size == 0 {
            return Err("Event buffer size cannot be zero".to_string());
        }

        if self.notification_buffer_size == 0 {
            return Err("Notification buffer size cannot be zero".to_string());
        }

        if self.shutdown_timeout.is_zero() {
            return Err("Shutdown timeout cannot be zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.stop_all_notify, StopAllNotify::Latest);
        assert!(is_valid_capacity(config.effective_capacity()));
    }

    #[test]
    fn test_config_builder_methods() {
        let config = OrchestratorConfig::default()
            .with_pool_capacity(3)
            .with_stop_all_notify(StopAllNotify::All)
            .with_shutdown_timeout(Duration::from_secs(1));

        assert_eq!(config.effective_capacity(), 3);
        assert_eq!(config.stop_all_notify, StopAllNotify::All);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_failures() {
        assert!(OrchestratorConfig::default()
            .with_pool_capacity(0)
            .validate()
            .is_err());
        assert!(OrchestratorConfig::default()
            .with_pool_capacity(9)
            .validate()
            .is_err());
        assert!(OrchestratorConfig::default()
            .with_notification_buffer(0)
            .validate()
            .is_err());
    }
}
