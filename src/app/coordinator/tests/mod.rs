//! Unit tests for the orchestrator handle and reactor
//!
//! These tests drive the reactor through the public handle with a small
//! in-memory transport. End-to-end scenarios are located in the top-level
//! tests directory.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::timeout;

use crate::app::models::Task;
use crate::app::reply::Delivery;
use crate::app::worker::{ProgressReporter, Transport};
use crate::errors::{TransportError, TransportResult};

use super::*;

/// Transport whose behavior is picked by the locator path
///
/// `/hold` never finishes, `/fail` always fails, anything else succeeds
/// with the payload `ok`.
struct PathTransport;

impl Transport for PathTransport {
    fn execute<'a>(
        &'a self,
        task: &'a Task,
        _progress: ProgressReporter,
    ) -> BoxFuture<'a, TransportResult<Vec<u8>>> {
        Box::pin(async move {
            if task.locator.ends_with("/hold") {
                pending::<TransportResult<Vec<u8>>>().await
            } else if task.locator.ends_with("/fail") {
                Err(TransportError::Simulated {
                    reason: "scripted failure".to_string(),
                })
            } else {
                Ok(b"ok".to_vec())
            }
        })
    }
}

/// Create test orchestrator configuration
///
/// Returns a configuration with a fixed pool capacity and a short
/// shutdown timeout so tests never wait on hardware-derived defaults.
pub fn create_test_config(capacity: usize) -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_pool_capacity(capacity)
        .with_shutdown_timeout(Duration::from_millis(200))
}

/// Start an orchestrator backed by [`PathTransport`]
pub fn start_test_orchestrator(capacity: usize) -> Orchestrator {
    Orchestrator::start(create_test_config(capacity), Arc::new(PathTransport)).unwrap()
}

/// Wait for a terminal delivery, failing the test after one second
async fn finish(reply: Reply) -> Delivery {
    timeout(Duration::from_secs(1), reply.finished())
        .await
        .expect("reply timed out")
        .expect("reply dropped without terminal delivery")
}

/// Poll stats until `check` holds, failing the test after one second
async fn wait_for_stats(
    orchestrator: &Orchestrator,
    check: impl Fn(&OrchestratorStats) -> bool,
) -> OrchestratorStats {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    loop {
        let stats = orchestrator.stats().await.unwrap();
        if check(&stats) {
            return stats;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached: {}",
            stats.summary()
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Invalid configuration is rejected before anything is spawned
#[tokio::test]
async fn test_start_rejects_invalid_config() {
    let config = OrchestratorConfig::default().with_pool_capacity(0);
    let result = Orchestrator::start(config, Arc::new(PathTransport));
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

/// A single successful request is delivered once, destroying, with payload
///
/// Verifies ids start at one and the reply is unregistered afterwards.
#[tokio::test]
async fn test_submit_delivers_success() {
    let orchestrator = start_test_orchestrator(2);

    let reply = orchestrator
        .submit(Task::get("https://test.invalid/ok"))
        .await
        .unwrap();
    assert_eq!(reply.request_id(), Some(RequestId(1)));

    let delivery = finish(reply).await;
    assert!(delivery.destroying);
    assert!(delivery.task.success);
    assert_eq!(delivery.task.payload, b"ok".to_vec());
    assert_eq!(delivery.task.id, RequestId(1));

    let stats = wait_for_stats(&orchestrator, |s| s.is_idle()).await;
    assert_eq!(stats.outcomes.succeeded, 1);
    assert_eq!(stats.pending_replies, 0);

    orchestrator.shutdown().await;
}

/// Malformed locators fail at submission and do not consume an id
#[tokio::test]
async fn test_invalid_locator_does_not_allocate_id() {
    let orchestrator = start_test_orchestrator(1);

    let err = orchestrator.submit(Task::get("")).await.unwrap_err();
    assert!(matches!(err, SubmitError::InvalidLocator { .. }));
    let err = orchestrator.submit(Task::get("not a url")).await.unwrap_err();
    assert!(matches!(err, SubmitError::InvalidLocator { .. }));

    let reply = orchestrator
        .submit(Task::get("https://test.invalid/ok"))
        .await
        .unwrap();
    assert_eq!(reply.request_id(), Some(RequestId(1)));
    finish(reply).await;

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_empty_batch_rejected() {
    let orchestrator = start_test_orchestrator(1);
    let err = orchestrator.submit_batch(Vec::new()).await.unwrap_err();
    assert!(matches!(err, SubmitError::EmptyBatch));
    orchestrator.shutdown().await;
}

/// A failing request with retries enabled runs twice, then fails terminally
#[tokio::test]
async fn test_failure_retried_once() {
    let orchestrator = start_test_orchestrator(1);

    let reply = orchestrator
        .submit(Task::get("https://test.invalid/fail"))
        .await
        .unwrap();
    let delivery = finish(reply).await;
    assert!(!delivery.task.success);
    assert_eq!(delivery.task.payload_text(), "Simulated failure: scripted failure");

    let stats = wait_for_stats(&orchestrator, |s| s.is_idle()).await;
    assert_eq!(stats.outcomes.retried, 1);
    assert_eq!(stats.outcomes.failed, 1);
    assert_eq!(stats.failed_once, 0);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_failure_without_retry_is_terminal() {
    let orchestrator = start_test_orchestrator(1);

    let reply = orchestrator
        .submit(Task::get("https://test.invalid/fail").with_retry(false))
        .await
        .unwrap();
    assert!(!finish(reply).await.task.success);

    let stats = wait_for_stats(&orchestrator, |s| s.is_idle()).await;
    assert_eq!(stats.outcomes.retried, 0);
    assert_eq!(stats.outcomes.failed, 1);

    orchestrator.shutdown().await;
}

/// Raising capacity lets waiting work start without any completion
#[tokio::test]
async fn test_set_capacity_dispatches_waiting_work() {
    let orchestrator = start_test_orchestrator(1);

    let _held = orchestrator
        .submit(Task::get("https://test.invalid/hold"))
        .await
        .unwrap();
    let waiting = orchestrator
        .submit(Task::get("https://test.invalid/ok"))
        .await
        .unwrap();

    let stats = wait_for_stats(&orchestrator, |s| s.running == 1).await;
    assert_eq!(stats.waiting, 1);

    assert!(orchestrator.set_pool_capacity(2).await);
    assert!(finish(waiting).await.task.success);
    assert_eq!(orchestrator.pool_capacity().await.unwrap(), 2);

    orchestrator.shutdown().await;
}

#[tokio::test]
async fn test_set_capacity_out_of_range_rejected() {
    let orchestrator = start_test_orchestrator(3);

    assert!(!orchestrator.set_pool_capacity(0).await);
    assert!(!orchestrator.set_pool_capacity(9).await);
    assert_eq!(orchestrator.pool_capacity().await.unwrap(), 3);

    orchestrator.shutdown().await;
}

/// Stopping an id nobody knows changes nothing
#[tokio::test]
async fn test_stop_unknown_request_is_noop() {
    let orchestrator = start_test_orchestrator(1);

    orchestrator.stop(RequestId(42)).await;
    orchestrator.stop_batch(BatchId(7)).await;

    let stats = orchestrator.stats().await.unwrap();
    assert!(stats.is_idle());
    assert_eq!(stats.outcomes.cancelled, 0);
    assert!(!stats.stopped);

    orchestrator.shutdown().await;
}

/// Stopping a running request frees its slot for the next waiting one
#[tokio::test]
async fn test_stop_running_request_frees_slot() {
    let orchestrator = start_test_orchestrator(1);

    let held = orchestrator
        .submit(Task::get("https://test.invalid/hold"))
        .await
        .unwrap();
    let next = orchestrator
        .submit(Task::get("https://test.invalid/ok"))
        .await
        .unwrap();
    let held_id = held.request_id().unwrap();

    wait_for_stats(&orchestrator, |s| s.running == 1 && s.waiting == 1).await;
    orchestrator.stop(held_id).await;

    let cancelled = finish(held).await;
    assert!(!cancelled.task.success);
    assert_eq!(
        cancelled.task.payload_text(),
        format!("Operation canceled (Request id: {})", held_id)
    );
    assert!(finish(next).await.task.success);

    orchestrator.shutdown().await;
}

/// The batch ledger is queryable while open and gone once finished
#[tokio::test]
async fn test_batch_progress_snapshot_lifecycle() {
    let orchestrator = start_test_orchestrator(1);

    let (reply, batch) = orchestrator
        .submit_batch(vec![
            Task::get("https://test.invalid/ok"),
            Task::get("https://test.invalid/hold"),
        ])
        .await
        .unwrap();

    let snapshot = loop {
        let snapshot = orchestrator.batch_progress(batch).await.unwrap().unwrap();
        if snapshot.finished == 1 {
            break snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };
    assert_eq!(snapshot.total, 2);

    orchestrator.stop_batch(batch).await;
    let delivery = finish(reply).await;
    assert_eq!(delivery.task.batch_id, batch);
    assert_eq!(
        delivery.task.payload_text(),
        format!("Operation canceled (Batch id: {})", batch)
    );
    assert!(orchestrator.batch_progress(batch).await.unwrap().is_none());

    orchestrator.shutdown().await;
}

/// After shutdown every handle call reports a closed orchestrator
#[tokio::test]
async fn test_shutdown_closes_handles() {
    let orchestrator = start_test_orchestrator(1);
    let _held = orchestrator
        .submit(Task::get("https://test.invalid/hold"))
        .await
        .unwrap();

    orchestrator.shutdown().await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while orchestrator.is_running() {
        assert!(tokio::time::Instant::now() < deadline);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(matches!(orchestrator.stats().await, Err(SubmitError::Closed)));
    assert!(matches!(
        orchestrator.submit(Task::get("https://test.invalid/ok")).await,
        Err(SubmitError::Closed)
    ));
    assert!(!orchestrator.set_pool_capacity(2).await);

    // A second shutdown is harmless
    orchestrator.shutdown().await;
}
