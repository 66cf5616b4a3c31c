//! Command-line interface components
//!
//! This module contains CLI-specific code for the request orchestrator,
//! including argument parsing, command handlers and progress display.

pub mod args;
pub mod commands;
pub mod progress;

pub use args::{BatchArgs, Cli, Commands, FetchArgs, GlobalArgs, SimulateArgs};
pub use commands::{handle_batch, handle_fetch, handle_simulate, load_config, RunSummary};
pub use progress::{ProgressConfig, ProgressDisplay};
