//! Application constants for the request orchestrator
//!
//! This module centralizes all constants used throughout the crate,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Worker pool sizing
pub mod pool {
    /// Fallback capacity when hardware concurrency cannot be determined
    pub const FALLBACK_CAPACITY: usize = 4;

    /// Smallest accepted pool capacity
    pub const MIN_CAPACITY: usize = 1;

    /// Largest accepted pool capacity
    pub const MAX_CAPACITY: usize = 8;
}

/// Identity allocation
pub mod ids {
    /// Batch id reserved for "not part of a batch"
    pub const NO_BATCH: u64 = 0;

    /// First id handed out by a fresh allocator
    pub const FIRST_ID: u64 = 1;
}

/// Reactor channel sizing
pub mod channels {
    /// Buffer for commands and worker events flowing into the reactor
    pub const EVENT_BUFFER_SIZE: usize = 1024;

    /// Buffer for broadcast progress/completion notifications
    pub const NOTIFICATION_BUFFER_SIZE: usize = 256;
}

/// Cancellation payload texts delivered to reply handles
pub mod messages {
    /// Payload for a global stop
    pub const CANCELED_ALL: &str = "Operation canceled (All Request)";

    /// Payload for a single request stop
    pub fn canceled_request(id: u64) -> String {
        format!("Operation canceled (Request id: {})", id)
    }

    /// Payload for a batch stop
    pub fn canceled_batch(batch_id: u64) -> String {
        format!("Operation canceled (Batch id: {})", batch_id)
    }

    /// Payload for a task whose locator failed validation at dispatch time
    pub fn invalid_locator(locator: &str) -> String {
        format!("Invalid request locator: {}", locator)
    }
}

/// HTTP transport configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("request-orchestrator/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;

    /// Default rate limit (requests per second, 0 = unlimited)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 0;
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic download writes
    pub const TEMP_FILE_SUFFIX: &str = ".part";

    /// Read chunk size for uploads (64KB)
    pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
}

/// Simulation defaults
pub mod simulation {
    /// Minimum simulated transfer time (milliseconds)
    pub const MIN_LATENCY_MS: u64 = 20;

    /// Maximum simulated transfer time (milliseconds)
    pub const MAX_LATENCY_MS: u64 = 200;

    /// Default probability that a simulated transfer fails
    pub const FAILURE_RATE: f64 = 0.05;

    /// Number of progress reports per simulated transfer
    pub const PROGRESS_STEPS: u32 = 4;

    /// Default simulated payload size in bytes
    pub const PAYLOAD_BYTES: u64 = 64 * 1024;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

/// Configuration file discovery
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_FILE_NAME: &str = "request-orchestrator.toml";

    /// Directory name under the user config directory
    pub const APP_DIR_NAME: &str = "request-orchestrator";

    /// File name under the application config directory
    pub const FILE_NAME: &str = "config.toml";
}

/// Timeout for joining the reactor on shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// Re-export commonly used constants for convenience
pub use http::USER_AGENT;
pub use ids::NO_BATCH;
pub use pool::{FALLBACK_CAPACITY, MAX_CAPACITY, MIN_CAPACITY};
