//! Batch ledger and progress aggregation
//!
//! Each open batch carries its task count, its success count and, per
//! direction, the last cumulative byte count seen for every member task.
//! Aggregate totals are maintained incrementally from non-negative deltas so
//! duplicate or out-of-order progress reports can never make a batch total
//! shrink or double-count.
//!
//! An entry is created when the batch is opened and removed in one step when
//! the batch completes, is stopped, or aborts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::models::{BatchId, Direction, RequestId};

/// Outcome of recording one successful member task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchCompletion {
    /// More members are outstanding
    InProgress { finished: usize, total: usize },
    /// The last member succeeded; the entry has been removed
    Complete,
    /// No ledger entry exists for the batch
    Unknown,
}

/// Point-in-time view of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSnapshot {
    pub batch: BatchId,
    pub total: usize,
    pub finished: usize,
    pub downloaded: u64,
    pub uploaded: u64,
}

#[derive(Debug, Default)]
struct DirectionProgress {
    per_task: HashMap<RequestId, u64>,
    aggregate: u64,
}

impl DirectionProgress {
    fn apply(&mut self, request: RequestId, bytes: u64) -> u64 {
        let last = self.per_task.entry(request).or_insert(0);
        if bytes > *last {
            self.aggregate += bytes - *last;
            *last = bytes;
        }
        self.aggregate
    }
}

#[derive(Debug)]
struct BatchEntry {
    total: usize,
    finished: usize,
    download: DirectionProgress,
    upload: DirectionProgress,
}

impl BatchEntry {
    fn direction_mut(&mut self, direction: Direction) -> &mut DirectionProgress {
        match direction {
            Direction::Download => &mut self.download,
            Direction::Upload => &mut self.upload,
        }
    }

    fn direction(&self, direction: Direction) -> &DirectionProgress {
        match direction {
            Direction::Download => &self.download,
            Direction::Upload => &self.upload,
        }
    }
}

/// Per-batch counters and byte-progress maps
#[derive(Debug, Default)]
pub struct BatchLedger {
    batches: HashMap<BatchId, BatchEntry>,
}

impl BatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a batch with `total` member tasks
    pub fn open(&mut self, batch: BatchId, total: usize) {
        self.batches.insert(
            batch,
            BatchEntry {
                total,
                finished: 0,
                download: DirectionProgress::default(),
                upload: DirectionProgress::default(),
            },
        );
    }

    /// Count one successful member
    ///
    /// When the finished count reaches the total the whole entry is removed
    /// before returning [`BatchCompletion::Complete`].
    pub fn record_success(&mut self, batch: BatchId) -> BatchCompletion {
        let Some(entry) = self.batches.get_mut(&batch) else {
            return BatchCompletion::Unknown;
        };

        if entry.finished < entry.total {
            entry.finished += 1;
        }

        if entry.finished == entry.total {
            self.batches.remove(&batch);
            debug!("Batch {} complete, ledger entry removed", batch);
            BatchCompletion::Complete
        } else {
            BatchCompletion::InProgress {
                finished: entry.finished,
                total: entry.total,
            }
        }
    }

    /// Apply a cumulative progress report and return the batch aggregate
    ///
    /// Only the positive difference against the task's last recorded value
    /// is added. A report of 0 bytes leaves state untouched and just returns
    /// the current aggregate. Returns `None` for a batch with no entry.
    pub fn update_progress(
        &mut self,
        batch: BatchId,
        request: RequestId,
        direction: Direction,
        bytes: u64,
    ) -> Option<u64> {
        let entry = self.batches.get_mut(&batch)?;
        let progress = entry.direction_mut(direction);
        if bytes == 0 {
            return Some(progress.aggregate);
        }
        Some(progress.apply(request, bytes))
    }

    /// Current aggregate bytes for `batch` in `direction`
    pub fn aggregate(&self, batch: BatchId, direction: Direction) -> Option<u64> {
        self.batches
            .get(&batch)
            .map(|entry| entry.direction(direction).aggregate)
    }

    pub fn snapshot(&self, batch: BatchId) -> Option<BatchSnapshot> {
        self.batches.get(&batch).map(|entry| BatchSnapshot {
            batch,
            total: entry.total,
            finished: entry.finished,
            downloaded: entry.download.aggregate,
            uploaded: entry.upload.aggregate,
        })
    }

    pub fn contains(&self, batch: BatchId) -> bool {
        self.batches.contains_key(&batch)
    }

    /// Remove every entry for `batch`; returns whether one existed
    pub fn remove(&mut self, batch: BatchId) -> bool {
        self.batches.remove(&batch).is_some()
    }

    /// Number of open batches
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH: BatchId = BatchId(1);

    #[test]
    fn test_completion_after_all_successes() {
        let mut ledger = BatchLedger::new();
        ledger.open(BATCH, 3);

        assert_eq!(
            ledger.record_success(BATCH),
            BatchCompletion::InProgress {
                finished: 1,
                total: 3
            }
        );
        assert_eq!(
            ledger.record_success(BATCH),
            BatchCompletion::InProgress {
                finished: 2,
                total: 3
            }
        );
        assert_eq!(ledger.record_success(BATCH), BatchCompletion::Complete);

        // Entry is gone the moment the batch completes
        assert!(!ledger.contains(BATCH));
        assert!(ledger.snapshot(BATCH).is_none());
        assert_eq!(ledger.record_success(BATCH), BatchCompletion::Unknown);
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut ledger = BatchLedger::new();
        ledger.open(BATCH, 2);

        assert_eq!(
            ledger.update_progress(BATCH, RequestId(1), Direction::Download, 100),
            Some(100)
        );
        // Out-of-order report contributes nothing
        assert_eq!(
            ledger.update_progress(BATCH, RequestId(1), Direction::Download, 80),
            Some(100)
        );
        // Duplicate report contributes nothing
        assert_eq!(
            ledger.update_progress(BATCH, RequestId(1), Direction::Download, 100),
            Some(100)
        );
        assert_eq!(
            ledger.update_progress(BATCH, RequestId(1), Direction::Download, 150),
            Some(150)
        );
    }

    #[test]
    fn test_aggregate_is_sum_of_latest_per_task() {
        let mut ledger = BatchLedger::new();
        ledger.open(BATCH, 2);

        ledger.update_progress(BATCH, RequestId(1), Direction::Download, 40);
        ledger.update_progress(BATCH, RequestId(2), Direction::Download, 10);
        ledger.update_progress(BATCH, RequestId(1), Direction::Download, 60);
        ledger.update_progress(BATCH, RequestId(2), Direction::Upload, 7);

        assert_eq!(ledger.aggregate(BATCH, Direction::Download), Some(70));
        assert_eq!(ledger.aggregate(BATCH, Direction::Upload), Some(7));

        let snapshot = ledger.snapshot(BATCH).unwrap();
        assert_eq!(snapshot.downloaded, 70);
        assert_eq!(snapshot.uploaded, 7);
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.finished, 0);
    }

    #[test]
    fn test_zero_bytes_is_a_query() {
        let mut ledger = BatchLedger::new();
        ledger.open(BATCH, 1);
        ledger.update_progress(BATCH, RequestId(1), Direction::Upload, 25);

        assert_eq!(
            ledger.update_progress(BATCH, RequestId(9), Direction::Upload, 0),
            Some(25)
        );
        assert_eq!(ledger.aggregate(BATCH, Direction::Upload), Some(25));
    }

    #[test]
    fn test_batches_are_independent() {
        let mut ledger = BatchLedger::new();
        ledger.open(BatchId(1), 1);
        ledger.open(BatchId(2), 1);

        ledger.update_progress(BatchId(1), RequestId(1), Direction::Download, 500);
        ledger.update_progress(BatchId(2), RequestId(2), Direction::Download, 3);

        assert_eq!(ledger.aggregate(BatchId(1), Direction::Download), Some(500));
        assert_eq!(ledger.aggregate(BatchId(2), Direction::Download), Some(3));
    }

    #[test]
    fn test_unknown_batch_and_remove() {
        let mut ledger = BatchLedger::new();
        assert!(ledger
            .update_progress(BATCH, RequestId(1), Direction::Download, 10)
            .is_none());

        ledger.open(BATCH, 4);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.remove(BATCH));
        assert!(!ledger.remove(BATCH));
        assert!(ledger.is_empty());
    }
}
