//! Message types for actor communication.

use queue_core::{BulkJob, EnqueuedJob, JobId, JobState, QueueEvent, QueueOptions};
use ractor::{ActorRef, RpcReplyPort};
use tokio::sync::mpsc;

/// Messages for the QueueActor.
#[derive(Debug)]
pub enum QueueMessage {
    /// Add jobs in order.
    Add {
        jobs: Vec<BulkJob>,
        reply: RpcReplyPort<Result<Vec<EnqueuedJob>, String>>,
    },

    /// List jobs in the given states (all states when empty).
    GetJobs {
        states: Vec<JobState>,
        reply: RpcReplyPort<Vec<EnqueuedJob>>,
    },

    /// Get a job by ID.
    GetJob {
        job_id: JobId,
        reply: RpcReplyPort<Option<EnqueuedJob>>,
    },

    /// Count pending jobs.
    Count { reply: RpcReplyPort<u64> },

    /// Remove waiting (and optionally delayed) jobs.
    Drain {
        delayed: bool,
        reply: RpcReplyPort<usize>,
    },

    /// Remove a single job.
    Remove {
        job_id: JobId,
        reply: RpcReplyPort<bool>,
    },

    /// Record progress for a job.
    UpdateProgress {
        job_id: JobId,
        progress: serde_json::Value,
        reply: RpcReplyPort<bool>,
    },

    /// Move a delayed job to waiting once its delay elapsed.
    Promote { job_id: JobId },

    /// Pause the queue.
    Pause { reply: RpcReplyPort<()> },

    /// Resume the queue.
    Resume { reply: RpcReplyPort<()> },

    /// Open an event channel for one handle.
    Subscribe {
        subscriber: u64,
        reply: RpcReplyPort<mpsc::Receiver<QueueEvent>>,
    },

    /// Close a handle's event channel after the events already sent to it.
    Unsubscribe {
        subscriber: u64,
        reply: RpcReplyPort<()>,
    },

    /// Stop the queue actor.
    Shutdown,
}

/// Messages for the Supervisor.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Open a queue by name, spawning its actor on first use.
    OpenQueue {
        name: String,
        options: QueueOptions,
        reply: RpcReplyPort<ActorRef<QueueMessage>>,
    },

    /// List the names of open queues.
    ListQueues { reply: RpcReplyPort<Vec<String>> },

    /// Shutdown all queues.
    Shutdown,
}
