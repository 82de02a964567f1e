//! Event types emitted by queues.

use serde::{Deserialize, Serialize};

use crate::{EnqueuedJob, JobId, JobState};

/// The closed set of events a queue emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueEventKind {
    Waiting,
    Removed,
    Cleaned,
    Paused,
    Resumed,
    Progress,
    Error,
    Closed,
}

impl QueueEventKind {
    /// Every kind, in declaration order.
    pub const ALL: [QueueEventKind; 8] = [
        QueueEventKind::Waiting,
        QueueEventKind::Removed,
        QueueEventKind::Cleaned,
        QueueEventKind::Paused,
        QueueEventKind::Resumed,
        QueueEventKind::Progress,
        QueueEventKind::Error,
        QueueEventKind::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueEventKind::Waiting => "waiting",
            QueueEventKind::Removed => "removed",
            QueueEventKind::Cleaned => "cleaned",
            QueueEventKind::Paused => "paused",
            QueueEventKind::Resumed => "resumed",
            QueueEventKind::Progress => "progress",
            QueueEventKind::Error => "error",
            QueueEventKind::Closed => "closed",
        }
    }
}

impl std::fmt::Display for QueueEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by a queue, one payload shape per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// A job was accepted and is waiting (or delayed/paused).
    Waiting { job: EnqueuedJob },
    /// A job was removed.
    Removed { job_id: JobId },
    /// Jobs in `state` were removed in one sweep.
    Cleaned { job_ids: Vec<JobId>, state: JobState },
    /// The queue was paused.
    Paused,
    /// The queue was resumed.
    Resumed,
    /// A job reported progress.
    Progress {
        job_id: JobId,
        progress: serde_json::Value,
    },
    /// The engine reported an error for the queue.
    Error { message: String },
    /// The handle's connection was closed.
    Closed,
}

impl QueueEvent {
    /// The kind listeners subscribe to for this event.
    pub fn kind(&self) -> QueueEventKind {
        match self {
            QueueEvent::Waiting { .. } => QueueEventKind::Waiting,
            QueueEvent::Removed { .. } => QueueEventKind::Removed,
            QueueEvent::Cleaned { .. } => QueueEventKind::Cleaned,
            QueueEvent::Paused => QueueEventKind::Paused,
            QueueEvent::Resumed => QueueEventKind::Resumed,
            QueueEvent::Progress { .. } => QueueEventKind::Progress,
            QueueEvent::Error { .. } => QueueEventKind::Error,
            QueueEvent::Closed => QueueEventKind::Closed,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            QueueEvent::Waiting { job } => Some(job.id),
            QueueEvent::Removed { job_id } => Some(*job_id),
            QueueEvent::Progress { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            QueueEvent::Waiting { job } => format!("Job {} ({}) waiting", job.id, job.name),
            QueueEvent::Removed { job_id } => format!("Job {} removed", job_id),
            QueueEvent::Cleaned { job_ids, state } => {
                format!("{} {} jobs cleaned", job_ids.len(), state)
            }
            QueueEvent::Paused => "Queue paused".to_string(),
            QueueEvent::Resumed => "Queue resumed".to_string(),
            QueueEvent::Progress { job_id, progress } => {
                format!("Job {} progress {}", job_id, progress)
            }
            QueueEvent::Error { message } => format!("Queue error: {}", message),
            QueueEvent::Closed => "Queue connection closed".to_string(),
        }
    }
}
