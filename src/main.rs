//! Request Orchestrator CLI application
//!
//! Command-line interface for running HTTP requests through the bounded
//! worker pool, individually or as a batch, plus a simulation mode.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library
use request_orchestrator::cli::{
    handle_batch, handle_fetch, handle_simulate, load_config, Cli, Commands,
};
use request_orchestrator::config::LoggingConfig;
use request_orchestrator::errors::Result;

#[tokio::main]
async fn main() {
    // Initialize program
    let result = run().await;

    // Handle any errors that occurred
    match result {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Main application logic; `Ok(false)` means some requests did not succeed
async fn run() -> Result<bool> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok(); // Ignore errors if file doesn't exist

    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration, then initialize logging from flags and config
    let config = load_config(&cli.global).await?;
    init_logging(&cli, &config.logging);

    info!("Request Orchestrator v{} starting", env!("CARGO_PKG_VERSION"));

    // Execute the appropriate command
    let summary = match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(config, cli.global, args).await?
        }
        Commands::Batch(args) => {
            info!("Executing batch command");
            handle_batch(config, cli.global, args).await?
        }
        Commands::Simulate(args) => {
            info!("Executing simulate command");
            handle_simulate(config, cli.global, args).await?
        }
    };

    Ok(summary.is_success())
}

/// Initialize logging based on CLI verbosity settings
///
/// Verbosity flags win over the `[logging] level` key. `RUST_LOG` still
/// applies to other crates.
fn init_logging(cli: &Cli, logging: &LoggingConfig) {
    let log_level = if cli.has_verbosity_flag() {
        cli.log_level().to_string().to_lowercase()
    } else {
        logging.level.clone()
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("request_orchestrator={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(logging.colored_output)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
