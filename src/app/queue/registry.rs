//! Failed-once registry
//!
//! Membership, not a counter, distinguishes a first failure from a second:
//! the first [`FailedOnceRegistry::record`] for an id succeeds, every later
//! one reports that the id was already retried.

use std::collections::HashSet;

use crate::app::models::RequestId;

/// Request ids that have already failed once
#[derive(Debug, Default)]
pub struct FailedOnceRegistry {
    ids: HashSet<RequestId>,
}

impl FailedOnceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a first failure
    ///
    /// Returns `true` if `id` was not yet present (a retry is allowed) and
    /// `false` if it had already failed once.
    pub fn record(&mut self, id: RequestId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.ids.contains(&id)
    }

    /// Forget `id`; returns whether it was present
    pub fn remove(&mut self, id: RequestId) -> bool {
        self.ids.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}
