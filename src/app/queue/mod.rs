//! Holding areas for admitted work
//!
//! Two structures live here, both owned exclusively by the reactor:
//!
//! - [`WaitQueue`]: FIFO of tasks admitted but not yet running, with removal
//!   by request id or by batch id for cancellation
//! - [`FailedOnceRegistry`]: request ids that have already failed once, used
//!   to bound retries to a single re-attempt
//!
//! Neither type does any locking. The reactor is the single writer, so both
//! are plain collections wrapped in a domain-specific API.

pub mod registry;
pub mod wait;

pub use registry::FailedOnceRegistry;
pub use wait::WaitQueue;
