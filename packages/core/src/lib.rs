//! Core domain types for the queue manager.
//!
//! This crate contains shared types used across all packages:
//! - Job, FlowJob and EnqueuedJob for work items
//! - QueueOptions and the queue configuration map
//! - QueueEvent for per-queue notifications
//! - The QueueEngine / QueueHandle traits the manager is generic over

mod engine;
mod events;
mod job;
mod queue;

pub use engine::{
    EngineError, EngineResult, EventCallback, ListenerId, QueueEngine, QueueHandle,
};
pub use events::{QueueEvent, QueueEventKind};
pub use job::{BulkJob, EnqueuedJob, FlowJob, Job, JobId, JobName, JobOptions, JobState};
pub use queue::{QueueConfigMap, QueueName, QueueOptions, QueueSetting, StreamOptions};
