//! Error types for the queue manager.

use queue_core::{EngineError, QueueEventKind};
use thiserror::Error;

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Errors raised by the queue manager.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{manager} is disconnected")]
    NotConnected { manager: String },

    #[error("{manager} is closed")]
    AlreadyClosed { manager: String },

    #[error("{manager} is already connected")]
    AlreadyConnected { manager: String },

    #[error("no {kind} listener registered for this subscription")]
    NotRegistered { kind: QueueEventKind },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("queue {queue}: {source}")]
    Engine {
        queue: String,
        #[source]
        source: EngineError,
    },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Routing failures, surfaced when a job is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no queue is routed for job kind {kind}")]
    UnroutedJob { kind: String },

    #[error("queue {queue} is not registered")]
    UnknownQueue { queue: String },
}

/// One failed branch of a fan-out operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    pub queue: String,
    pub error: EngineError,
}

/// Every failed branch of a fan-out operation, reported once all branches settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    pub operation: &'static str,
    pub failures: Vec<BranchFailure>,
}

impl AggregateError {
    pub fn new(operation: &'static str, failures: Vec<BranchFailure>) -> Self {
        Self {
            operation,
            failures,
        }
    }

    /// Names of the queues whose branch failed, in branch order.
    pub fn failed_queues(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.queue.as_str()).collect()
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} failed on {} queue(s)",
            self.operation,
            self.failures.len()
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{} ({})", sep, failure.queue, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
