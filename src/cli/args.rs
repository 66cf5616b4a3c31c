//! Command-line argument parsing for the request orchestrator
//!
//! This module defines the CLI structure using clap derive macros: fetching
//! independent URLs, fetching URLs as one batch, and running a simulated
//! batch against the fake transport.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::constants::pool;

/// Request Orchestrator - run HTTP transfers through a bounded worker pool
#[derive(Parser, Debug)]
#[command(
    name = "request_orchestrator",
    version,
    about = "Run HTTP requests through a bounded worker pool",
    long_about = "Runs HTTP requests through a bounded worker pool with FIFO admission,
one automatic retry per request, batch progress tracking and cancellation."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Concurrent transfers (1-8); overrides the config file
    #[arg(short = 'w', long, global = true)]
    pub workers: Option<usize>,

    /// Print the final summary as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch URLs as independent requests
    Fetch(FetchArgs),

    /// Fetch URLs as a single batch
    Batch(BatchArgs),

    /// Run a synthetic batch against the simulated transport
    Simulate(SimulateArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// URLs to request
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Save each response into this directory instead of discarding it
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Do not retry failed requests
    #[arg(long)]
    pub no_retry: bool,
}

/// Arguments for the batch command
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// URLs to request
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Save each response into this directory instead of discarding it
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Cancel the whole batch on the first terminal failure
    #[arg(long)]
    pub abort_on_failure: bool,

    /// Do not retry failed requests
    #[arg(long)]
    pub no_retry: bool,
}

/// Arguments for the simulate command
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of tasks in the batch
    #[arg(short = 'n', long, default_value = "20")]
    pub tasks: usize,

    /// Probability that a simulated transfer fails (overrides config)
    #[arg(long)]
    pub failure_rate: Option<f64>,

    /// Random seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Cancel the whole batch on the first terminal failure
    #[arg(long)]
    pub abort_on_failure: bool,

    /// Do not retry failed requests
    #[arg(long)]
    pub no_retry: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether any flag asks for a specific verbosity
    pub fn has_verbosity_flag(&self) -> bool {
        self.global.quiet || self.global.verbose || self.global.very_verbose
    }

    /// Get the logging level based on global arguments
    pub fn log_level(&self) -> tracing::Level {
        if self.global.quiet {
            tracing::Level::ERROR
        } else if self.global.very_verbose {
            tracing::Level::DEBUG
        } else if self.global.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

impl GlobalArgs {
    /// Reject a worker count the pool would not accept
    pub fn validate(&self) -> Result<(), String> {
        if let Some(workers) = self.workers {
            if !(pool::MIN_CAPACITY..=pool::MAX_CAPACITY).contains(&workers) {
                return Err(format!(
                    "Number of workers must be between {} and {}, got {}",
                    pool::MIN_CAPACITY,
                    pool::MAX_CAPACITY,
                    workers
                ));
            }
        }
        Ok(())
    }
}

impl SimulateArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.tasks == 0 {
            return Err("Number of tasks must be greater than 0".to_string());
        }
        if let Some(rate) = self.failure_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("Failure rate must be within [0, 1], got {}", rate));
            }
        }
        Ok(())
    }
}
