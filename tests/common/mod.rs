//! Shared helpers for integration tests
//!
//! [`ScriptedTransport`] decides what to do from the locator path, so a
//! test scripts each task just by choosing its URL:
//!
//! - `/ok` succeeds with payload `ok`
//! - `/fail` always fails
//! - `/flaky` fails on its first attempt and succeeds afterwards
//! - `/hold` never finishes
//! - `/gate` waits for [`ScriptedTransport::release`], then succeeds
//! - `/progress/a/b/...` reports download bytes a, b, ... of 1000, then succeeds
//! - `/upload/a/b/...` the same as upload progress
//! - `/panic` panics inside the transport
//!
//! A query string keeps otherwise identical locators apart.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::pending;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::{broadcast, Semaphore};
use tokio::time::{timeout, Instant};
use url::Url;

use request_orchestrator::app::coordinator::{
    Notification, Orchestrator, OrchestratorConfig, OrchestratorStats, StopAllNotify,
};
use request_orchestrator::app::models::Task;
use request_orchestrator::app::reply::{Delivery, Reply};
use request_orchestrator::app::worker::{ProgressReporter, Transport};
use request_orchestrator::errors::{TransportError, TransportResult};

/// Total bytes announced by scripted progress reports
pub const PROGRESS_TOTAL: u64 = 1000;

/// Locator for a scripted behavior, e.g. `url("/ok?n=1")`
pub fn url(path_and_query: &str) -> String {
    format!("https://scripted.test{}", path_and_query)
}

/// In-memory transport driven by locator paths
pub struct ScriptedTransport {
    gate: Semaphore,
    started: Mutex<Vec<String>>,
    attempts: Mutex<HashMap<String, u32>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: Mutex::new(Vec::new()),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Let `n` gated tasks finish
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Locators in the order their attempts started
    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    /// How many times `locator` was executed
    pub fn attempts(&self, locator: &str) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(locator)
            .copied()
            .unwrap_or(0)
    }

    /// Record an attempt, returning its 1-based attempt number
    fn begin(&self, locator: &str) -> u32 {
        self.started.lock().unwrap().push(locator.to_string());
        let mut attempts = self.attempts.lock().unwrap();
        let count = attempts.entry(locator.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

fn scripted_failure(reason: &str) -> TransportError {
    TransportError::Simulated {
        reason: reason.to_string(),
    }
}

fn explode() -> TransportResult<Vec<u8>> {
    panic!("scripted panic")
}

impl Transport for ScriptedTransport {
    fn execute<'a>(
        &'a self,
        task: &'a Task,
        progress: ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            let attempt = self.begin(&task.locator);
            let parsed = Url::parse(&task.locator)
                .map_err(|e| scripted_failure(&format!("unparseable locator: {}", e)))?;
            let segments: Vec<String> = parsed
                .path_segments()
                .map(|s| s.map(str::to_string).collect())
                .unwrap_or_default();

            match segments.first().map(String::as_str) {
                Some("ok") => Ok(b"ok".to_vec()),
                Some("fail") => Err(scripted_failure("scripted failure")),
                Some("flaky") if attempt == 1 => Err(scripted_failure("first attempt fails")),
                Some("flaky") => Ok(b"recovered".to_vec()),
                Some("hold") => pending::<TransportResult<Vec<u8>>>().await,
                Some("gate") => {
                    let permit = self
                        .gate
                        .acquire()
                        .await
                        .map_err(|_| scripted_failure("gate closed"))?;
                    permit.forget();
                    Ok(b"released".to_vec())
                }
                Some(kind @ ("progress" | "upload")) => {
                    for value in segments.iter().skip(1) {
                        let bytes: u64 = value.parse().unwrap_or(0);
                        if kind == "upload" {
                            progress.upload(bytes, PROGRESS_TOTAL).await;
                        } else {
                            progress.download(bytes, PROGRESS_TOTAL).await;
                        }
                    }
                    Ok(b"ok".to_vec())
                }
                Some("panic") => explode(),
                _ => Err(scripted_failure("unknown script")),
            }
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Start an orchestrator with a fixed capacity over a fresh scripted transport
pub fn start(capacity: usize) -> (Orchestrator, Arc<ScriptedTransport>) {
    start_with(capacity, StopAllNotify::Latest)
}

pub fn start_with(
    capacity: usize,
    notify: StopAllNotify,
) -> (Orchestrator, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    let config = OrchestratorConfig::default()
        .with_pool_capacity(capacity)
        .with_stop_all_notify(notify)
        .with_shutdown_timeout(Duration::from_millis(500));
    let orchestrator = Orchestrator::start(config, transport.clone()).unwrap();
    (orchestrator, transport)
}

/// Wait for the terminal delivery of `reply`
pub async fn finish(reply: Reply) -> Delivery {
    timeout(Duration::from_secs(2), reply.finished())
        .await
        .expect("reply timed out")
        .expect("reply dropped without terminal delivery")
}

/// Wait for the next delivery of `reply`
pub async fn next(reply: &mut Reply) -> Delivery {
    timeout(Duration::from_secs(2), reply.next())
        .await
        .expect("reply timed out")
        .expect("reply ended")
}

/// Wait until `reply` ends without a terminal delivery
pub async fn expect_dropped(reply: Reply) {
    let outcome = timeout(Duration::from_secs(2), reply.finished())
        .await
        .expect("reply timed out");
    assert!(outcome.is_none(), "unexpected delivery: {:?}", outcome);
}

/// Poll stats until `check` holds
pub async fn wait_for_stats(
    orchestrator: &Orchestrator,
    check: impl Fn(&OrchestratorStats) -> bool,
) -> OrchestratorStats {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let stats = orchestrator.stats().await.unwrap();
        if check(&stats) {
            return stats;
        }
        assert!(
            Instant::now() < deadline,
            "condition not reached: {}",
            stats.summary()
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Wait until the transport has started `count` attempts
pub async fn wait_for_started(transport: &ScriptedTransport, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while transport.started().len() < count {
        assert!(Instant::now() < deadline, "only {:?} started", transport.started());
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Everything already published on `rx`
pub fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut seen = Vec::new();
    while let Ok(notification) = rx.try_recv() {
        seen.push(notification);
    }
    seen
}
