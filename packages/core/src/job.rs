//! Job domain types for work submitted through the manager.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Marker for the names of a job-kind catalog.
///
/// Implemented for every type that can act as a map key and render itself
/// as the job name handed to the engine, so a plain enum with a `Display`
/// impl (or a `String`) works as a catalog.
pub trait JobName: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {}

impl<T> JobName for T where T: Clone + Eq + Ord + Hash + Debug + Display + Send + Sync + 'static {}

/// Unique identifier for an accepted job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-job submission options.
///
/// Every field is optional so that a job's options can be layered over the
/// queue's default job options; a field set on the job wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobOptions {
    /// Total number of attempts the engine makes before failing the job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Priority band; lower values are served first, `0` means unprioritized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    /// Delay before the job becomes waiting, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Caller-chosen job id label, kept alongside the generated id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Remove the job once it completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_on_complete: Option<bool>,
    /// Remove the job once it fails for good.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_on_fail: Option<bool>,
    /// Put the job at the front of its priority band.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifo: Option<bool>,
}

impl JobOptions {
    /// Options with only `attempts` set.
    pub fn with_attempts(attempts: u32) -> Self {
        Self {
            attempts: Some(attempts),
            ..Default::default()
        }
    }

    /// Set the priority band.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the delay in milliseconds.
    pub fn delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }

    /// Set the LIFO flag.
    pub fn lifo(mut self, lifo: bool) -> Self {
        self.lifo = Some(lifo);
        self
    }

    /// Layer `overrides` on top of `self`; fields set on `overrides` win.
    pub fn merged(&self, overrides: &JobOptions) -> JobOptions {
        JobOptions {
            attempts: overrides.attempts.or(self.attempts),
            priority: overrides.priority.or(self.priority),
            delay_ms: overrides.delay_ms.or(self.delay_ms),
            job_id: overrides.job_id.clone().or_else(|| self.job_id.clone()),
            remove_on_complete: overrides.remove_on_complete.or(self.remove_on_complete),
            remove_on_fail: overrides.remove_on_fail.or(self.remove_on_fail),
            lifo: overrides.lifo.or(self.lifo),
        }
    }
}

/// A unit of work of kind `J`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job<J> {
    /// Job kind, used for routing.
    pub kind: J,
    /// Opaque payload handed to the engine.
    pub payload: serde_json::Value,
    /// Per-job submission options.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JobOptions>,
}

impl<J> Job<J> {
    /// Create a job without per-job options.
    pub fn new(kind: J, payload: serde_json::Value) -> Self {
        Self {
            kind,
            payload,
            options: None,
        }
    }

    /// Attach per-job options.
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// A job together with an ordered tree of child jobs.
///
/// Flow composition is done by a separate layer; the manager itself only
/// routes and submits flat jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowJob<J> {
    #[serde(flatten)]
    pub job: Job<J>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FlowJob<J>>,
}

impl<J> FlowJob<J> {
    pub fn new(job: Job<J>) -> Self {
        Self {
            job,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: FlowJob<J>) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first, parent-before-children walk over every job in the tree.
    pub fn iter(&self) -> impl Iterator<Item = &Job<J>> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(&node.job)
        })
    }
}

/// Where an accepted job sits inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    Waiting,
    Delayed,
    Prioritized,
    Paused,
    WaitingChildren,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Delayed => "delayed",
            JobState::Prioritized => "prioritized",
            JobState::Paused => "paused",
            JobState::WaitingChildren => "waiting-children",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as accepted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnqueuedJob {
    /// Engine-assigned identifier.
    pub id: JobId,
    /// Job name (the kind's display form).
    pub name: String,
    /// Queue that accepted the job.
    pub queue: String,
    /// Payload as submitted.
    pub payload: serde_json::Value,
    /// Effective options after layering over the queue defaults.
    pub options: JobOptions,
    /// Current state.
    pub state: JobState,
    /// When the engine accepted the job.
    pub timestamp: DateTime<Utc>,
}

/// One entry of an `add_bulk` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkJob {
    pub name: String,
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<JobOptions>,
}

impl<J: std::fmt::Display> From<Job<J>> for BulkJob {
    fn from(job: Job<J>) -> Self {
        Self {
            name: job.kind.to_string(),
            payload: job.payload,
            options: job.options,
        }
    }
}
