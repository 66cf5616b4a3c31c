//! Orchestrator statistics
//!
//! A snapshot of reactor state returned by
//! [`Orchestrator::stats`](super::Orchestrator::stats).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running totals kept by the reactor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounters {
    /// Tasks delivered as successful
    pub succeeded: u64,
    /// Tasks delivered as failed after retry policy was applied
    pub failed: u64,
    /// Re-attempts scheduled after a first failure
    pub retried: u64,
    /// Tasks removed by stop, stop_batch or stop_all
    pub cancelled: u64,
}

/// Point-in-time view of the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStats {
    /// Pool slots currently held
    pub active_workers: usize,
    /// Tasks bound to a live worker
    pub running: usize,
    /// Tasks in the wait queue
    pub waiting: usize,
    /// Request ids that have failed once
    pub failed_once: usize,
    /// Batches with a ledger entry
    pub open_batches: usize,
    /// Single-task replies not yet delivered
    pub pending_replies: usize,
    /// Batch replies not yet delivered terminally
    pub pending_batch_replies: usize,
    pub pool_capacity: usize,
    /// Global stop flag
    pub stopped: bool,
    pub outcomes: OutcomeCounters,
    pub started_at: DateTime<Utc>,
}

impl OrchestratorStats {
    /// Whether nothing is running, waiting or awaiting delivery
    pub fn is_idle(&self) -> bool {
        self.running == 0
            && self.waiting == 0
            && self.pending_replies == 0
            && self.pending_batch_replies == 0
    }

    /// Time since the reactor started
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} running, {} waiting, {}/{} slots, {} ok, {} failed, {} retried, {} cancelled",
            self.running,
            self.waiting,
            self.active_workers,
            self.pool_capacity,
            self.outcomes.succeeded,
            self.outcomes.failed,
            self.outcomes.retried,
            self.outcomes.cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> OrchestratorStats {
        OrchestratorStats {
            active_workers: 0,
            running: 0,
            waiting: 0,
            failed_once: 0,
            open_batches: 0,
            pending_replies: 0,
            pending_batch_replies: 0,
            pool_capacity: 4,
            stopped: false,
            outcomes: OutcomeCounters::default(),
            started_at: Utc::now(),
        }
    }

    #[test]
    fn test_idle_detection() {
        let mut s = stats();
        assert!(s.is_idle());
        s.waiting = 1;
        assert!(!s.is_idle());
    }

    #[test]
    fn test_summary_mentions_counts() {
        let mut s = stats();
        s.outcomes.succeeded = 3;
        s.outcomes.retried = 1;
        let summary = s.summary();
        assert!(summary.contains("3 ok"));
        assert!(summary.contains("1 retried"));
        assert!(summary.contains("0/4 slots"));
    }
}
