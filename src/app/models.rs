//! Data models for network transfer tasks
//!
//! A [`Task`] is one network operation owned by the orchestrator from
//! admission until its terminal delivery. Workers only ever see a copy.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::ids;
use crate::errors::{SubmitError, SubmitResult};

/// Unique identifier of one request (always > 0 once admitted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a batch; [`BatchId::NONE`] marks a task outside any batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl BatchId {
    /// Sentinel for "not part of a batch"
    pub const NONE: BatchId = BatchId(ids::NO_BATCH);

    /// Whether this id is the "no batch" sentinel
    pub fn is_none(&self) -> bool {
        self.0 == ids::NO_BATCH
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transfer direction of a progress report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Download,
    Upload,
}

/// What the transport should do with the locator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestKind {
    /// Fetch the resource and return its body as the payload
    #[default]
    Get,
    /// Send `body` and return the response body as the payload
    Post { body: Vec<u8> },
    /// Stream the resource into `destination`
    Download { destination: PathBuf },
    /// Send the contents of `source` and return the response body
    Upload { source: PathBuf },
}

/// One network operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Request id, assigned at admission
    pub id: RequestId,
    /// Owning batch, or [`BatchId::NONE`]
    pub batch_id: BatchId,
    /// Target resource locator
    pub locator: String,
    /// Operation to perform
    pub kind: RequestKind,
    /// Set by the worker on completion
    pub success: bool,
    /// Result body on success, error text on failure
    pub payload: Vec<u8>,
    /// Permit exactly one re-attempt after a first failure
    pub retry_on_failure: bool,
    /// Cancel the whole batch when this task fails terminally
    pub abort_batch_on_failure: bool,
}

impl Task {
    /// Create a task for `locator` with the given kind
    pub fn new(locator: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            id: RequestId::default(),
            batch_id: BatchId::NONE,
            locator: locator.into(),
            kind,
            success: false,
            payload: Vec::new(),
            retry_on_failure: true,
            abort_batch_on_failure: false,
        }
    }

    /// Create a GET task
    pub fn get(locator: impl Into<String>) -> Self {
        Self::new(locator, RequestKind::Get)
    }

    /// Create a POST task sending `body`
    pub fn post(locator: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(locator, RequestKind::Post { body: body.into() })
    }

    /// Create a download-to-file task
    pub fn download(locator: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self::new(
            locator,
            RequestKind::Download {
                destination: destination.into(),
            },
        )
    }

    /// Create an upload-from-file task
    pub fn upload(locator: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self::new(
            locator,
            RequestKind::Upload {
                source: source.into(),
            },
        )
    }

    /// Enable or disable the single retry
    pub fn with_retry(mut self, enabled: bool) -> Self {
        self.retry_on_failure = enabled;
        self
    }

    /// Enable or disable aborting the batch when this task fails
    pub fn with_abort_batch_on_failure(mut self, enabled: bool) -> Self {
        self.abort_batch_on_failure = enabled;
        self
    }

    /// Whether this task belongs to a batch
    pub fn in_batch(&self) -> bool {
        !self.batch_id.is_none()
    }

    /// Admitted tasks carry a non-zero request id
    pub fn is_admitted(&self) -> bool {
        self.id.0 > 0
    }

    /// Payload rendered as text (lossy)
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Mark the task as failed with `message` as payload
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.success = false;
        self.payload = message.into().into_bytes();
    }

    /// Mark the task as succeeded with `payload`
    pub fn succeed_with(&mut self, payload: Vec<u8>) {
        self.success = true;
        self.payload = payload;
    }
}

/// Validate a locator: non-empty and a well-formed absolute URL
pub fn validate_locator(locator: &str) -> SubmitResult<Url> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::InvalidLocator {
            locator: locator.to_string(),
            reason: "empty locator".to_string(),
        });
    }

    Url::parse(trimmed).map_err(|e| SubmitError::InvalidLocator {
        locator: locator.to_string(),
        reason: e.to_string(),
    })
}

/// Check a locator without returning the parsed form
pub fn is_locator_valid(locator: &str) -> bool {
    validate_locator(locator).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_defaults() {
        let task = Task::get("https://example.com/a.bin");
        assert_eq!(task.id, RequestId(0));
        assert!(task.batch_id.is_none());
        assert!(!task.in_batch());
        assert!(!task.is_admitted());
        assert!(task.retry_on_failure);
        assert!(!task.abort_batch_on_failure);
        assert_eq!(task.kind, RequestKind::Get);
    }

    #[test]
    fn test_task_builders() {
        let task = Task::download("https://example.com/a.bin", "/tmp/a.bin")
            .with_retry(false)
            .with_abort_batch_on_failure(true);
        assert!(!task.retry_on_failure);
        assert!(task.abort_batch_on_failure);
        assert_eq!(
            task.kind,
            RequestKind::Download {
                destination: PathBuf::from("/tmp/a.bin")
            }
        );
    }

    #[test]
    fn test_outcome_helpers() {
        let mut task = Task::get("https://example.com");
        task.succeed_with(b"hello".to_vec());
        assert!(task.success);
        assert_eq!(task.payload_text(), "hello");

        task.fail_with("nope");
        assert!(!task.success);
        assert_eq!(task.payload_text(), "nope");
    }

    #[test]
    fn test_locator_validation() {
        assert!(validate_locator("https://example.com/file.csv").is_ok());
        assert!(validate_locator("ftp://mirror.example.org/pub").is_ok());

        assert!(matches!(
            validate_locator(""),
            Err(SubmitError::InvalidLocator { .. })
        ));
        assert!(!is_locator_valid("   "));
        assert!(!is_locator_valid("not a url"));
        assert!(!is_locator_valid("/relative/path"));
    }
}
