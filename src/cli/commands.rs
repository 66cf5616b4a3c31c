//! Command handlers for the CLI
//!
//! Each handler takes the loaded configuration, starts an orchestrator over
//! the right transport, installs the signal handler, feeds the progress display from
//! reply deliveries and notifications, and prints a summary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::coordinator::{Orchestrator, OrchestratorStats, SignalHandler};
use crate::app::models::Task;
use crate::app::worker::Transport;
use crate::app::{HttpTransport, SimulatedTransport};
use crate::cli::{BatchArgs, FetchArgs, GlobalArgs, ProgressConfig, ProgressDisplay, SimulateArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, Result};

/// Outcome of one CLI run, printed as text or JSON
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub command: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub bytes_transferred: u64,
    pub elapsed_ms: u128,
    /// Failure payloads keyed by locator
    pub failures: Vec<(String, String)>,
    pub stats: Option<OrchestratorStats>,
}

impl RunSummary {
    fn new(command: &str, total: usize) -> Self {
        Self {
            command: command.to_string(),
            total,
            ..Default::default()
        }
    }

    fn record(&mut self, task: &Task) {
        if task.success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
            self.failures.push((task.locator.clone(), task.payload_text()));
        }
    }

    /// Requests that never produced a result of their own
    fn settle(&mut self) {
        self.cancelled = self.total.saturating_sub(self.succeeded + self.failed);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            let rendered = serde_json::to_string_pretty(self)
                .map_err(|e| AppError::generic(format!("Failed to render summary: {}", e)))?;
            println!("{}", rendered);
            return Ok(());
        }

        println!();
        println!("Summary ({}):", self.command);
        println!("   Requests: {}", self.total);
        println!("   Succeeded: {}", self.succeeded);
        println!("   Failed: {}", self.failed);
        println!("   Cancelled: {}", self.cancelled);
        println!("   Transferred: {} bytes", self.bytes_transferred);
        println!("   Duration: {} ms", self.elapsed_ms);
        for (locator, reason) in &self.failures {
            println!("   ✗ {}: {}", locator, reason);
        }
        Ok(())
    }
}

/// Load config and apply global overrides
pub async fn load_config(global: &GlobalArgs) -> Result<AppConfig> {
    global.validate().map_err(AppError::generic)?;

    let mut config = AppConfig::load(global.config.clone()).await?;
    if let Some(workers) = global.workers {
        config.orchestrator.pool_capacity = Some(workers);
    }
    Ok(config)
}

fn start_orchestrator(config: &AppConfig, transport: Arc<dyn Transport>) -> Result<Orchestrator> {
    let (orchestrator_config, _, _) = config.to_runtime_config();
    info!(
        "Starting orchestrator with {} transport, capacity {}",
        transport.name(),
        orchestrator_config.effective_capacity()
    );
    Ok(Orchestrator::start(orchestrator_config, transport)?)
}

fn progress_display(global: &GlobalArgs) -> ProgressDisplay {
    ProgressDisplay::new(ProgressConfig {
        enable_progress_bars: !global.quiet && !global.json,
        ..Default::default()
    })
}

/// File name for the `index`-th response saved under `dir`
pub fn output_path(dir: &Path, locator: &str, index: usize) -> PathBuf {
    let name = Url::parse(locator)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| "index.html".to_string());
    dir.join(format!("{}-{}", index + 1, name))
}

fn build_task(locator: &str, output: Option<&Path>, index: usize, retry: bool) -> Task {
    let task = match output {
        Some(dir) => Task::download(locator, output_path(dir, locator, index)),
        None => Task::get(locator),
    };
    task.with_retry(retry)
}

async fn ensure_output_dir(output: Option<&Path>) -> Result<()> {
    if let Some(dir) = output {
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}

/// Fetch URLs as independent requests
pub async fn handle_fetch(
    config: AppConfig,
    global: GlobalArgs,
    args: FetchArgs,
) -> Result<RunSummary> {
    let (_, client_config, _) = config.to_runtime_config();
    ensure_output_dir(args.output.as_deref()).await?;

    let transport = Arc::new(HttpTransport::from_config(&client_config)?);
    let orchestrator = start_orchestrator(&config, transport)?;
    let signals = SignalHandler::new(orchestrator.clone()).setup();

    let tasks = args
        .urls
        .iter()
        .enumerate()
        .map(|(i, url)| build_task(url, args.output.as_deref(), i, !args.no_retry))
        .collect();

    let summary = run_singles(&orchestrator, tasks, &global).await?;

    signals.abort();
    finish(orchestrator, summary, &global).await
}

/// Fetch URLs as one batch
pub async fn handle_batch(
    config: AppConfig,
    global: GlobalArgs,
    args: BatchArgs,
) -> Result<RunSummary> {
    let (_, client_config, _) = config.to_runtime_config();
    ensure_output_dir(args.output.as_deref()).await?;

    let transport = Arc::new(HttpTransport::from_config(&client_config)?);
    let orchestrator = start_orchestrator(&config, transport)?;
    let signals = SignalHandler::new(orchestrator.clone()).setup();

    let tasks = args
        .urls
        .iter()
        .enumerate()
        .map(|(i, url)| {
            build_task(url, args.output.as_deref(), i, !args.no_retry)
                .with_abort_batch_on_failure(args.abort_on_failure)
        })
        .collect();

    let summary = run_batch(&orchestrator, tasks, "batch", &global).await?;

    signals.abort();
    finish(orchestrator, summary, &global).await
}

/// Run a synthetic batch against the simulated transport
pub async fn handle_simulate(
    config: AppConfig,
    global: GlobalArgs,
    args: SimulateArgs,
) -> Result<RunSummary> {
    args.validate().map_err(AppError::generic)?;

    let mut simulation = config.simulation.clone();
    if let Some(rate) = args.failure_rate {
        simulation = simulation.with_failure_rate(rate);
    }
    if let Some(seed) = args.seed {
        simulation = simulation.with_seed(seed);
    }
    simulation.validate().map_err(AppError::generic)?;

    let transport = Arc::new(SimulatedTransport::new(simulation));
    let orchestrator = start_orchestrator(&config, transport)?;
    let signals = SignalHandler::new(orchestrator.clone()).setup();

    let tasks = (0..args.tasks)
        .map(|i| {
            Task::get(format!("https://simulated.invalid/task/{}", i + 1))
                .with_retry(!args.no_retry)
                .with_abort_batch_on_failure(args.abort_on_failure)
        })
        .collect();

    let summary = run_batch(&orchestrator, tasks, "simulate", &global).await?;

    signals.abort();
    finish(orchestrator, summary, &global).await
}

/// Submit each task on its own and wait for every terminal delivery
async fn run_singles(
    orchestrator: &Orchestrator,
    tasks: Vec<Task>,
    global: &GlobalArgs,
) -> Result<RunSummary> {
    let started = Instant::now();
    let mut summary = RunSummary::new("fetch", tasks.len());
    let mut display = progress_display(global);
    display.start(tasks.len(), orchestrator.subscribe())?;

    let mut pending = FuturesUnordered::new();
    for task in tasks {
        let locator = task.locator.clone();
        match orchestrator.submit(task).await {
            Ok(reply) => pending.push(reply.finished()),
            Err(e) => {
                warn!("Rejected {}: {}", locator, e);
                let mut rejected = Task::get(locator);
                rejected.fail_with(e.to_string());
                display.record(&rejected);
                summary.record(&rejected);
            }
        }
    }

    while let Some(outcome) = pending.next().await {
        match outcome {
            Some(delivery) => {
                display.record(&delivery.task);
                summary.record(&delivery.task);
            }
            None => debug!("Reply dropped without a result"),
        }
    }

    summary.bytes_transferred = display.finish();
    summary.elapsed_ms = started.elapsed().as_millis();
    summary.settle();
    Ok(summary)
}

/// Submit tasks as one batch and follow its reply to the end
///
/// A batch whose failures do not abort it never completes on its own, so it
/// is stopped once every member has reported.
async fn run_batch(
    orchestrator: &Orchestrator,
    tasks: Vec<Task>,
    command: &str,
    global: &GlobalArgs,
) -> Result<RunSummary> {
    let started = Instant::now();
    let total = tasks.len();
    let mut summary = RunSummary::new(command, total);
    let mut display = progress_display(global);
    display.start(total, orchestrator.subscribe())?;

    let (mut reply, batch) = orchestrator.submit_batch(tasks).await?;
    info!("Submitted batch {} with {} requests", batch, total);

    let mut reported = 0;
    while let Some(delivery) = reply.next().await {
        if !delivery.task.is_admitted() {
            // Cancellation of the batch as a whole
            debug!("Batch {} closed: {}", batch, delivery.task.payload_text());
            break;
        }

        display.record(&delivery.task);
        summary.record(&delivery.task);
        reported += 1;

        if delivery.destroying {
            break;
        }
        if reported == total {
            debug!("Every member of batch {} reported, closing it", batch);
            orchestrator.stop_batch(batch).await;
        }
    }

    summary.bytes_transferred = display.finish();
    summary.elapsed_ms = started.elapsed().as_millis();
    summary.settle();
    Ok(summary)
}

async fn finish(
    orchestrator: Orchestrator,
    mut summary: RunSummary,
    global: &GlobalArgs,
) -> Result<RunSummary> {
    summary.stats = orchestrator.stats().await.ok();
    orchestrator.shutdown().await;

    if !global.quiet || global.json {
        summary.print(global.json)?;
    }
    Ok(summary)
}
