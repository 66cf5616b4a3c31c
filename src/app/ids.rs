//! Identity allocation for requests and batches
//!
//! Request and batch ids are strictly increasing and never reused within the
//! lifetime of an allocator. Batch id 0 is never handed out; it marks a task
//! that does not belong to any batch.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::app::models::{BatchId, RequestId};
use crate::constants::ids;

/// Allocator for request and batch identifiers
#[derive(Debug)]
pub struct IdAllocator {
    next_request: AtomicU64,
    next_batch: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first ids are 1
    pub fn new() -> Self {
        Self {
            next_request: AtomicU64::new(ids::FIRST_ID),
            next_batch: AtomicU64::new(ids::FIRST_ID),
        }
    }

    /// Allocate the next request id
    pub fn new_request_id(&self) -> RequestId {
        RequestId(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate the next batch id (never 0)
    pub fn new_batch_id(&self) -> BatchId {
        BatchId(self.next_batch.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
