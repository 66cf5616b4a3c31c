//! Configuration management for the request orchestrator
//!
//! This module loads the TOML configuration file and converts it into the
//! runtime configuration structs used by the orchestrator and transports.
//! Every key is optional; a missing file means all defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, OrchestratorConfig, SimulationConfig, StopAllNotify};
use crate::constants::{channels, config as files, http, logging, SHUTDOWN_TIMEOUT};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker pool and reactor settings
    pub orchestrator: OrchestratorConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Simulated transport settings
    pub simulation: SimulationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfigToml {
    /// Concurrent transfers (unset = hardware concurrency, clamped to 1..=8)
    pub pool_capacity: Option<usize>,
    pub event_buffer_size: usize,
    pub notification_buffer_size: usize,
    /// Which replies hear about a global stop: "latest" or "all"
    pub stop_all_notify: StopAllNotify,
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for OrchestratorConfigToml {
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

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    pub user_agent: String,
    /// TCP keep-alive interval (unset = disabled)
    #[serde(default, with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout (unset = no timeout)
    #[serde(default, with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    pub pool_max_per_host: usize,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Requests per second (0 = unlimited)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            user_agent: http::USER_AGENT.to_string(),
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: http::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,
    /// Colored terminal output
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
            colored_output: true,
        }
    }
}

impl AppConfig {
    /// Convert to runtime configuration structs
    pub fn to_runtime_config(&self) -> (OrchestratorConfig, ClientConfig, SimulationConfig) {
        (
            self.orchestrator.to_runtime_config(),
            self.client.to_runtime_config(),
            self.simulation.clone(),
        )
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Otherwise the first file found in the
    /// standard locations is used, and defaults apply when there is none.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every section against its runtime constraints
    pub fn validate(&self) -> ConfigResult<()> {
        let (orchestrator, client, simulation) = self.to_runtime_config();
        orchestrator
            .validate()
            .map_err(|reason| invalid("orchestrator", &orchestrator, reason))?;
        client
            .validate()
            .map_err(|reason| invalid("client", &client, reason))?;
        simulation
            .validate()
            .map_err(|reason| invalid("simulation", &simulation, reason))?;
        Ok(())
    }

    /// Standard config file locations, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".").join(files::LOCAL_FILE_NAME)];
        if let Some(path) = Self::default_config_path() {
            paths.push(path);
        }
        paths
    }

    fn find_config_file() -> Option<PathBuf> {
        let found = Self::search_paths().into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::APP_DIR_NAME).join(files::FILE_NAME))
    }

    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}

fn invalid(field: &str, value: &impl std::fmt::Debug, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: format!("{:?}", value),
        reason,
    }
}

impl OrchestratorConfigToml {
    pub fn to_runtime_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            pool_capacity: self.pool_capacity,
            event_buffer_size: self.event_buffer_size,
            notification_buffer_size: self.notification_buffer_size,
            stop_all_notify: self.stop_all_notify,
            shutdown_timeout: self.shutdown_timeout,
        }
    }
}

impl ClientConfigToml {
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            user_agent: self.user_agent.clone(),
            tcp_keepalive: self.tcp_keepalive,
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout,
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_default_config_creation() {
        let config = AppConfig::default();

        assert_eq!(config.orchestrator.pool_capacity, None);
        assert_eq!(config.orchestrator.stop_all_notify, StopAllNotify::Latest);
        assert_eq!(config.client.rate_limit_rps, http::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        // Should fail when explicitly specified
        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_config_loading_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let test_config = r#"
[orchestrator]
pool_capacity = 3
stop_all_notify = "all"
shutdown_timeout = "2s"

[client]
request_timeout = "15s"
rate_limit_rps = 20

[simulation]
failure_rate = 0.5
min_latency = "1ms"
max_latency = "5ms"

[logging]
level = "debug"
"#;

        tokio::fs::write(&config_path, test_config).await.unwrap();

        let config = AppConfig::load(Some(config_path)).await.unwrap();
        let (orchestrator, client, simulation) = config.to_runtime_config();

        assert_eq!(orchestrator.pool_capacity, Some(3));
        assert_eq!(orchestrator.stop_all_notify, StopAllNotify::All);
        assert_eq!(orchestrator.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(client.request_timeout, Duration::from_secs(15));
        assert_eq!(client.rate_limit_rps, 20);
        assert_eq!(simulation.failure_rate, 0.5);
        assert_eq!(simulation.max_latency, Duration::from_millis(5));
        assert_eq!(config.logging.level, "debug");

        // Unspecified values keep their defaults
        assert_eq!(client.connect_timeout, http::CONNECT_TIMEOUT);
        assert_eq!(
            orchestrator.event_buffer_size,
            channels::EVENT_BUFFER_SIZE
        );
    }

    #[tokio::test]
    async fn test_config_rejects_out_of_range_capacity() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        tokio::fs::write(&config_path, "[orchestrator]\npool_capacity = 12\n")
            .await
            .unwrap();

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "orchestrator"
        ));
    }

    #[tokio::test]
    async fn test_config_rejects_malformed_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.toml");
        tokio::fs::write(&config_path, "[orchestrator\npool_capacity = ")
            .await
            .unwrap();

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_search_paths_start_with_local_file() {
        let paths = AppConfig::search_paths();
        assert_eq!(paths[0], PathBuf::from("./request-orchestrator.toml"));
    }
}
