//! Concrete transports
//!
//! - [`HttpTransport`]: reqwest-backed transfers with optional rate limiting
//! - [`SimulatedTransport`]: latency and failure injection without network

pub mod config;
pub mod http;
pub mod simulated;

pub use config::ClientConfig;
pub use http::HttpTransport;
pub use simulated::{SimulatedTransport, SimulationConfig};
