//! The interface the manager consumes from a queue engine.
//!
//! An engine creates named queue handles; a handle accepts jobs, reports
//! readiness, closes, and lets callers attach event callbacks. Callbacks are
//! identified by the [`ListenerId`] returned when they are attached, which is
//! what [`QueueHandle::off`] takes to remove them again.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::{BulkJob, EnqueuedJob, JobOptions, JobState, QueueEvent, QueueEventKind, QueueOptions};

/// Callback attached to a single queue handle.
pub type EventCallback = Arc<dyn Fn(&QueueEvent) + Send + Sync>;

/// Identity of a callback attached to a queue handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

impl ListenerId {
    /// Allocate a process-wide unique listener id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Errors reported by a queue engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("queue handle is closed")]
    Closed,

    #[error("queue engine unavailable: {0}")]
    Unavailable(String),

    #[error("job rejected: {0}")]
    Rejected(String),

    #[error("actor error: {0}")]
    Actor(String),

    #[error("timed out waiting for the queue engine")]
    Timeout,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// A connection to one named queue inside the engine.
pub trait QueueHandle: Send + Sync + 'static {
    /// Queue name.
    fn name(&self) -> &str;

    /// Options the handle was created with.
    fn options(&self) -> &QueueOptions;

    /// Add one job.
    fn add(
        &self,
        name: &str,
        payload: serde_json::Value,
        options: Option<JobOptions>,
    ) -> impl Future<Output = EngineResult<EnqueuedJob>> + Send;

    /// Add several jobs in one call, keeping their order.
    fn add_bulk(
        &self,
        jobs: Vec<BulkJob>,
    ) -> impl Future<Output = EngineResult<Vec<EnqueuedJob>>> + Send;

    /// Settles once the transport behind the handle is usable.
    fn wait_until_ready(&self) -> impl Future<Output = EngineResult<()>> + Send;

    /// Tear the handle down.
    fn close(&self) -> impl Future<Output = EngineResult<()>> + Send;

    /// Number of jobs still pending in the queue.
    fn count(&self) -> impl Future<Output = EngineResult<u64>> + Send;

    /// Jobs in any of `states`, in queue order. An empty slice means every state.
    fn get_jobs(
        &self,
        states: &[JobState],
    ) -> impl Future<Output = EngineResult<Vec<EnqueuedJob>>> + Send;

    /// Remove waiting jobs, and delayed ones too when `delayed` is set.
    fn drain(&self, delayed: bool) -> impl Future<Output = EngineResult<()>> + Send;

    /// Attach a callback for `kind`.
    fn on(&self, kind: QueueEventKind, callback: EventCallback) -> ListenerId;

    /// Attach a callback for `kind` that is detached after its first call.
    fn once(&self, kind: QueueEventKind, callback: EventCallback) -> ListenerId;

    /// Detach a callback. Returns whether it was attached.
    fn off(&self, kind: QueueEventKind, id: ListenerId) -> bool;

    /// Number of callbacks currently attached for `kind`.
    fn listener_count(&self, kind: QueueEventKind) -> usize;
}

/// Factory for queue handles; this is the injected transport.
pub trait QueueEngine: Send + Sync + 'static {
    type Queue: QueueHandle;

    /// Create a handle for `name`. Must not block on the transport.
    fn create(&self, name: &str, options: QueueOptions) -> Self::Queue;
}
