//! Bounded worker pool
//!
//! The pool hands out at most `capacity` slots. Starting a task claims a slot
//! atomically; a saturated pool hands the task back untouched so the caller
//! can requeue it. Each running task gets its own shutdown channel, held by
//! the returned [`WorkerHandle`].
//!
//! The reactor never waits on the pool. When it needs to run again after a
//! slot frees up it arms a one-shot wake, which posts
//! [`WorkerEvent::SlotReleased`] on the next release.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::app::models::{BatchId, RequestId, Task};
use crate::constants::pool;

use super::core::TaskWorker;
use super::transport::Transport;
use super::types::WorkerEvent;

/// Capacity used when none is configured
///
/// Hardware concurrency, or the fallback when it cannot be determined,
/// clamped into the accepted range.
pub fn default_capacity() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(pool::FALLBACK_CAPACITY)
        .clamp(pool::MIN_CAPACITY, pool::MAX_CAPACITY)
}

/// Whether `capacity` lies in the accepted range
pub fn is_valid_capacity(capacity: usize) -> bool {
    (pool::MIN_CAPACITY..=pool::MAX_CAPACITY).contains(&capacity)
}

#[derive(Debug)]
struct PoolSlots {
    active: AtomicUsize,
    capacity: AtomicUsize,
    released: Notify,
}

impl PoolSlots {
    fn try_acquire(self: &Arc<Self>) -> Option<SlotGuard> {
        let mut active = self.active.load(Ordering::Acquire);
        loop {
            if active >= self.capacity.load(Ordering::Acquire) {
                return None;
            }
            match self.active.compare_exchange_weak(
                active,
                active + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return Some(SlotGuard {
                        slots: Arc::clone(self),
                    })
                }
                Err(current) => active = current,
            }
        }
    }
}

/// Claimed pool slot, released on drop
#[derive(Debug)]
pub(crate) struct SlotGuard {
    slots: Arc<PoolSlots>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.active.fetch_sub(1, Ordering::AcqRel);
        // notify_one keeps a permit if nobody is waiting yet
        self.slots.released.notify_one();
    }
}

/// Reactor-side handle to one running task
#[derive(Debug)]
pub struct WorkerHandle {
    id: RequestId,
    batch: BatchId,
    task: Task,
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn request_id(&self) -> RequestId {
        self.id
    }

    pub fn batch_id(&self) -> BatchId {
        self.batch
    }

    /// The task as it was handed to the worker
    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Signal the worker to quit and return its join handle
    ///
    /// The worker drops its transport future at the next poll and emits no
    /// further events.
    pub fn stop(self) -> JoinHandle<()> {
        // Full channel means a quit signal is already pending
        let _ = self.shutdown_tx.try_send(());
        self.join
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Bounded pool of task workers
pub struct WorkerPool {
    slots: Arc<PoolSlots>,
    transport: Arc<dyn Transport>,
    events: mpsc::Sender<WorkerEvent>,
    wake_armed: bool,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("active", &self.active())
            .field("capacity", &self.capacity())
            .field("transport", &self.transport.name())
            .field("wake_armed", &self.wake_armed)
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool; `capacity` must already be validated
    pub fn new(
        capacity: usize,
        transport: Arc<dyn Transport>,
        events: mpsc::Sender<WorkerEvent>,
    ) -> Self {
        info!(
            "Worker pool ready with capacity {} ({})",
            capacity,
            transport.name()
        );
        Self {
            slots: Arc::new(PoolSlots {
                active: AtomicUsize::new(0),
                capacity: AtomicUsize::new(capacity),
                released: Notify::new(),
            }),
            transport,
            events,
            wake_armed: false,
        }
    }

    /// Start `task` on a free slot
    ///
    /// Returns the task back if the pool is saturated at this instant.
    pub fn try_start(&self, task: Task) -> Result<WorkerHandle, Task> {
        let Some(slot) = self.slots.try_acquire() else {
            return Err(task);
        };

        let id = task.id;
        let batch = task.batch_id;
        let snapshot = task.clone();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let worker = TaskWorker::new(
            task,
            Arc::clone(&self.transport),
            self.events.clone(),
            shutdown_rx,
            slot,
        );
        let join = tokio::spawn(worker.run());

        debug!(
            "Started request {} ({}/{} slots busy)",
            id,
            self.active(),
            self.capacity()
        );

        Ok(WorkerHandle {
            id,
            batch,
            task: snapshot,
            shutdown_tx,
            join,
        })
    }

    /// Ask to be woken once by the next slot release
    ///
    /// Arming twice before the wake fires is a no-op.
    pub fn arm_wake(&mut self) {
        if self.wake_armed {
            return;
        }
        self.wake_armed = true;

        let slots = Arc::clone(&self.slots);
        let events = self.events.clone();
        tokio::spawn(async move {
            slots.released.notified().await;
            let _ = events.send(WorkerEvent::SlotReleased).await;
        });
    }

    /// Record that the armed wake has fired
    pub fn wake_fired(&mut self) {
        self.wake_armed = false;
    }

    pub fn is_wake_armed(&self) -> bool {
        self.wake_armed
    }

    /// Change the number of slots
    ///
    /// Rejects values outside the accepted range and leaves the capacity
    /// unchanged. Lowering the capacity never interrupts running tasks.
    pub fn set_capacity(&self, capacity: usize) -> bool {
        if !is_valid_capacity(capacity) {
            return false;
        }
        let previous = self.slots.capacity.swap(capacity, Ordering::AcqRel);
        info!("Pool capacity changed from {} to {}", previous, capacity);
        true
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity.load(Ordering::Acquire)
    }

    /// Slots currently held by running workers
    pub fn active(&self) -> usize {
        self.slots.active.load(Ordering::Acquire)
    }

    pub fn has_free_slot(&self) -> bool {
        self.active() < self.capacity()
    }
}
