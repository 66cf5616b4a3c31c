//! Real-time progress display for orchestrated requests
//!
//! This module renders orchestrator notifications with indicatif: one bar
//! counting finished requests and one line tracking transferred bytes.
//! When stderr is not a terminal it falls back to one text line per
//! finished request.
//!
//! # Examples
//!
//! ```rust,no_run
//! use request_orchestrator::cli::{ProgressConfig, ProgressDisplay};
//! use request_orchestrator::app::Orchestrator;
//!
//! # async fn example(orchestrator: Orchestrator) -> request_orchestrator::Result<()> {
//! let mut display = ProgressDisplay::new(ProgressConfig::default());
//! display.start(10, orchestrator.subscribe())?;
//!
//! // ... call display.record(&delivery) for every terminal delivery
//!
//! let bytes = display.finish();
//! println!("{} bytes transferred", bytes);
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::coordinator::Notification;
use crate::app::models::{BatchId, RequestId, Task};
use crate::errors::{AppError, Result};

/// Configuration for progress display
#[derive(Debug, Clone)]
pub struct ProgressConfig {
    /// Enable visual progress bars
    pub enable_progress_bars: bool,
    /// Show the transferred-bytes line
    pub show_bytes: bool,
    /// Maximum width for locators in messages
    pub max_locator_width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enable_progress_bars: true,
            show_bytes: true,
            max_locator_width: 48,
        }
    }
}

/// Running byte totals fed by notifications
///
/// Each request or batch reports cumulative bytes, so the latest value per
/// source replaces the previous one and the total is their sum.
#[derive(Debug, Default)]
struct ByteTally {
    requests: HashMap<RequestId, u64>,
    batches: HashMap<BatchId, u64>,
}

impl ByteTally {
    /// Apply a notification, returning the new total if it changed anything
    fn apply(&mut self, notification: &Notification) -> Option<u64> {
        match *notification {
            Notification::DownloadProgress { id, bytes, .. }
            | Notification::UploadProgress { id, bytes, .. } => {
                self.requests.insert(id, bytes);
            }
            Notification::BatchDownloadProgress { batch, bytes }
            | Notification::BatchUploadProgress { batch, bytes } => {
                self.batches.insert(batch, bytes);
            }
            Notification::BatchFinished { .. } => return None,
        }
        Some(self.total())
    }

    fn total(&self) -> u64 {
        self.requests.values().sum::<u64>() + self.batches.values().sum::<u64>()
    }
}

/// Main progress display manager
pub struct ProgressDisplay {
    config: ProgressConfig,
    is_terminal: bool,
    multi_progress: Option<MultiProgress>,
    main_progress: Option<ProgressBar>,
    bytes_progress: Option<ProgressBar>,
    listener: Option<JoinHandle<()>>,
    transferred: Arc<AtomicU64>,
    total: usize,
    finished: usize,
}

impl ProgressDisplay {
    /// Create a new progress display with the given configuration
    pub fn new(config: ProgressConfig) -> Self {
        let is_terminal = atty::is(atty::Stream::Stderr);

        Self {
            config,
            is_terminal,
            multi_progress: None,
            main_progress: None,
            bytes_progress: None,
            listener: None,
            transferred: Arc::new(AtomicU64::new(0)),
            total: 0,
            finished: 0,
        }
    }

    fn bars_enabled(&self) -> bool {
        self.config.enable_progress_bars && self.is_terminal
    }

    /// Start displaying progress for `total` requests
    pub fn start(
        &mut self,
        total: usize,
        notifications: broadcast::Receiver<Notification>,
    ) -> Result<()> {
        self.total = total;
        self.finished = 0;

        if self.bars_enabled() {
            let multi = MultiProgress::new();

            let main_pb = multi.add(ProgressBar::new(total as u64));
            main_pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .map_err(|e| AppError::generic(format!("Progress bar template error: {}", e)))?
                    .progress_chars("##-"),
            );
            main_pb.set_message("Running requests");

            if self.config.show_bytes {
                let bytes_pb = multi.add(ProgressBar::new_spinner());
                bytes_pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("  {spinner:.blue} {msg}")
                        .map_err(|e| {
                            AppError::generic(format!("Byte counter template error: {}", e))
                        })?,
                );
                bytes_pb.set_message("0 B transferred");
                self.bytes_progress = Some(bytes_pb);
            }

            self.main_progress = Some(main_pb);
            self.multi_progress = Some(multi);
        } else {
            eprintln!("Running {} requests...", total);
        }

        self.listener = Some(self.spawn_listener(notifications));
        debug!("Progress display started for {} requests", total);
        Ok(())
    }

    fn spawn_listener(&self, mut notifications: broadcast::Receiver<Notification>) -> JoinHandle<()> {
        let transferred = self.transferred.clone();
        let bytes_pb = self.bytes_progress.clone();

        tokio::spawn(async move {
            let mut tally = ByteTally::default();
            loop {
                match notifications.recv().await {
                    Ok(notification) => {
                        if let Notification::BatchFinished { batch } = notification {
                            debug!("Batch {} finished", batch);
                        }
                        if let Some(total) = tally.apply(&notification) {
                            transferred.store(total, Ordering::Relaxed);
                            if let Some(pb) = &bytes_pb {
                                pb.set_message(format!("{} transferred", HumanBytes(total)));
                                pb.tick();
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Progress display skipped {} notifications", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Count one terminal result
    pub fn record(&mut self, task: &Task) {
        self.finished += 1;
        let locator = truncate(&task.locator, self.config.max_locator_width);
        let status = if task.success { "ok" } else { "failed" };

        match &self.main_progress {
            Some(pb) => {
                pb.inc(1);
                pb.set_message(format!("{} {}", status, locator));
            }
            None => eprintln!(
                "[{}/{}] {} {}",
                self.finished, self.total, status, locator
            ),
        }
    }

    /// Stop the display and return the bytes seen in notifications
    pub fn finish(&mut self) -> u64 {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some(pb) = self.main_progress.take() {
            pb.finish_with_message("Done");
        }
        if let Some(pb) = self.bytes_progress.take() {
            pb.finish_and_clear();
        }
        self.multi_progress = None;
        self.transferred.load(Ordering::Relaxed)
    }
}

impl Drop for ProgressDisplay {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Keep the tail of long locators
fn truncate(locator: &str, width: usize) -> String {
    let count = locator.chars().count();
    if count <= width || width <= 3 {
        return locator.to_string();
    }
    let tail: String = locator.chars().skip(count - (width - 3)).collect();
    format!("...{}", tail)
}
