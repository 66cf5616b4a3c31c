//! Caller-facing reply handles
//!
//! The orchestrator talks to callers only through the [`ReplyHandle`] trait:
//! one `deliver(task, destroying)` entry point. A destroying delivery is the
//! last one a handle ever receives; the router drops the handle right after.
//!
//! [`ChannelReply`] is the stock implementation. It forwards every delivery
//! over an unbounded channel to a [`Reply`], which the caller awaits.
//!
//! # Examples
//!
//! ```rust,no_run
//! use request_orchestrator::app::reply::Reply;
//!
//! # async fn example(mut reply: Reply) {
//! while let Some(delivery) = reply.next().await {
//!     println!(
//!         "request {} success={} final={}",
//!         delivery.task.id, delivery.task.success, delivery.destroying
//!     );
//! }
//! # }
//! ```

pub mod router;

use tokio::sync::mpsc;
use tracing::debug;

use crate::app::models::{BatchId, RequestId, Task};

pub use router::ReplyRouter;

/// Sink for the results of one task or one batch
pub trait ReplyHandle: Send {
    /// Surface `task` to the caller
    ///
    /// `destroying` marks the terminal delivery; the handle is discarded
    /// immediately after this call returns.
    fn deliver(&mut self, task: &Task, destroying: bool);
}

/// One delivery as seen by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub task: Task,
    pub destroying: bool,
}

/// What a reply is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyTarget {
    Request(RequestId),
    Batch(BatchId),
}

/// Sender side of a channel-backed reply, owned by the router
#[derive(Debug)]
pub struct ChannelReply {
    target: ReplyTarget,
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelReply {
    /// Create a connected sender/receiver pair for `target`
    pub fn pair(target: ReplyTarget) -> (ChannelReply, Reply) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ChannelReply { target, tx },
            Reply {
                target,
                rx,
                finished: false,
            },
        )
    }
}

impl ReplyHandle for ChannelReply {
    fn deliver(&mut self, task: &Task, destroying: bool) {
        let delivery = Delivery {
            task: task.clone(),
            destroying,
        };
        if self.tx.send(delivery).is_err() {
            debug!("Reply for {:?} dropped by caller, delivery discarded", self.target);
        }
    }
}

/// Caller side of a channel-backed reply
#[derive(Debug)]
pub struct Reply {
    target: ReplyTarget,
    rx: mpsc::UnboundedReceiver<Delivery>,
    finished: bool,
}

impl Reply {
    pub fn target(&self) -> ReplyTarget {
        self.target
    }

    /// Request id for a single-task reply
    pub fn request_id(&self) -> Option<RequestId> {
        match self.target {
            ReplyTarget::Request(id) => Some(id),
            ReplyTarget::Batch(_) => None,
        }
    }

    /// Batch id for a batch reply
    pub fn batch_id(&self) -> Option<BatchId> {
        match self.target {
            ReplyTarget::Batch(id) => Some(id),
            ReplyTarget::Request(_) => None,
        }
    }

    /// Wait for the next delivery
    ///
    /// Returns `None` after the destroying delivery has been seen, or when
    /// the orchestrator dropped the handle without a terminal delivery.
    pub async fn next(&mut self) -> Option<Delivery> {
        if self.finished {
            return None;
        }
        let delivery = self.rx.recv().await;
        match &delivery {
            Some(d) if d.destroying => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        delivery
    }

    /// Wait for the terminal delivery, skipping intermediate ones
    pub async fn finished(mut self) -> Option<Delivery> {
        while let Some(delivery) = self.next().await {
            if delivery.destroying {
                return Some(delivery);
            }
        }
        None
    }

    /// Whether the terminal delivery has already been consumed
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: u64) -> Task {
        let mut task = Task::get("https://example.com");
        task.id = RequestId(id);
        task
    }

    #[tokio::test]
    async fn test_intermediate_then_terminal() {
        let (mut sender, mut reply) = ChannelReply::pair(ReplyTarget::Batch(BatchId(3)));
        assert_eq!(reply.batch_id(), Some(BatchId(3)));
        assert!(reply.request_id().is_none());

        sender.deliver(&task(1), false);
        sender.deliver(&task(2), true);
        // Nothing after a destroying delivery is surfaced
        sender.deliver(&task(3), false);

        let first = reply.next().await.unwrap();
        assert!(!first.destroying);
        assert_eq!(first.task.id, RequestId(1));

        let last = reply.next().await.unwrap();
        assert!(last.destroying);
        assert!(reply.is_finished());
        assert!(reply.next().await.is_none());
    }

    #[tokio::test]
    async fn test_finished_skips_intermediate() {
        let (mut sender, reply) = ChannelReply::pair(ReplyTarget::Batch(BatchId(1)));
        sender.deliver(&task(1), false);
        sender.deliver(&task(2), false);
        sender.deliver(&task(3), true);

        let terminal = reply.finished().await.unwrap();
        assert_eq!(terminal.task.id, RequestId(3));
    }

    #[tokio::test]
    async fn test_dropped_sender_ends_stream() {
        let (sender, reply) = ChannelReply::pair(ReplyTarget::Request(RequestId(1)));
        drop(sender);
        assert!(reply.finished().await.is_none());
    }

    #[test]
    fn test_deliver_after_caller_dropped_is_harmless() {
        let (mut sender, reply) = ChannelReply::pair(ReplyTarget::Request(RequestId(1)));
        drop(reply);
        sender.deliver(&task(1), true);
    }
}
