//! Error types for the request orchestrator
//!
//! Errors are grouped by the component that raises them. Transport failures
//! never cross the worker boundary as errors: workers turn them into failed
//! completions. The types here cover submission, transport internals,
//! configuration and the binary's top-level result.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously from submission calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// Locator is empty or not a well-formed URL
    #[error("Invalid request locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// A batch must contain at least one task
    #[error("Batch submission contains no tasks")]
    EmptyBatch,

    /// The reactor has shut down and no longer accepts work
    #[error("Orchestrator is no longer running")]
    Closed,
}

/// Failures raised inside a transport while executing one task
#[derive(Error, Debug)]
pub enum TransportError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error: HTTP {status}")]
    Status { status: u16 },

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Locator could not be parsed at execution time
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Request kind could not be executed by this transport
    #[error("Unsupported request: {reason}")]
    Unsupported { reason: String },

    /// Atomic rename of a finished download failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Transport code panicked while executing the task
    #[error("Transport panicked: {message}")]
    Panicked { message: String },

    /// Simulated failure
    #[error("Simulated failure: {reason}")]
    Simulated { reason: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// HTTP client could not be built from configuration
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Submission error
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// Transport error
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is transient and worth another attempt
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::Transport(TransportError::Http(_))
                | AppError::Transport(TransportError::Status { .. })
                | AppError::Transport(TransportError::Simulated { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Submit(_) => "submit",
            AppError::Transport(_) => "transport",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Submission result type alias
pub type SubmitResult<T> = std::result::Result<T, SubmitError>;

/// Transport result type alias
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        let err = AppError::from(SubmitError::EmptyBatch);
        assert_eq!(err.category(), "submit");
        assert!(!err.is_recoverable());

        let err = AppError::from(TransportError::Status { status: 503 });
        assert_eq!(err.category(), "transport");
        assert!(err.is_recoverable());

        let err = AppError::generic("boom");
        assert_eq!(err.category(), "generic");
        assert_eq!(err.to_string(), "Application error: boom");
    }

    #[test]
    fn test_submit_error_display() {
        let err = SubmitError::InvalidLocator {
            locator: "".to_string(),
            reason: "empty locator".to_string(),
        };
        assert!(err.to_string().contains("empty locator"));
    }
}
