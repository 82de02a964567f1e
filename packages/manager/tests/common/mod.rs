#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use queue_core::{
    BulkJob, EngineError, EngineResult, EnqueuedJob, EventCallback, JobId, JobOptions, JobState,
    ListenerId, QueueEngine, QueueEvent, QueueEventKind, QueueHandle, QueueOptions,
};
use queue_engine::ListenerTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Job1,
    Job2,
    Job3,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QueueKind {
    Queue1,
    Queue2,
    Queue3,
}

impl std::fmt::Display for QueueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Operations a mock queue can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Ready,
    Close,
    Add,
}

/// Everything a mock queue was asked to do.
#[derive(Default)]
pub struct QueueRecord {
    pub options: Mutex<Option<QueueOptions>>,
    pub jobs: Mutex<Vec<BulkJob>>,
    pub bulk_sizes: Mutex<Vec<usize>>,
    pub single_adds: AtomicUsize,
    pub ready_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    faults: Mutex<HashSet<Fault>>,
}

impl QueueRecord {
    pub fn job_names(&self) -> Vec<String> {
        self.jobs.lock().unwrap().iter().map(|j| j.name.clone()).collect()
    }

    pub fn bulk_sizes(&self) -> Vec<usize> {
        self.bulk_sizes.lock().unwrap().clone()
    }

    pub fn ready_calls(&self) -> usize {
        self.ready_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    fn check(&self, fault: Fault) -> EngineResult<()> {
        if self.faults.lock().unwrap().contains(&fault) {
            Err(EngineError::Unavailable(format!("injected {:?} failure", fault)))
        } else {
            Ok(())
        }
    }
}

/// Engine that records calls instead of talking to a broker.
#[derive(Clone, Default)]
pub struct MockEngine {
    records: Arc<Mutex<HashMap<String, Arc<QueueRecord>>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `queue`, created on first use.
    pub fn record(&self, queue: impl std::fmt::Display) -> Arc<QueueRecord> {
        self.records
            .lock()
            .unwrap()
            .entry(queue.to_string())
            .or_default()
            .clone()
    }

    /// Names of every queue the engine created, sorted.
    pub fn created(&self) -> Vec<String> {
        let records = self.records.lock().unwrap();
        let mut names: Vec<String> = records
            .iter()
            .filter(|(_, r)| r.options.lock().unwrap().is_some())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Make `fault` fail on `queue`.
    pub fn fail(&self, queue: impl std::fmt::Display, fault: Fault) {
        self.record(queue).faults.lock().unwrap().insert(fault);
    }

    /// Stop failing `fault` on `queue`.
    pub fn heal(&self, queue: impl std::fmt::Display, fault: Fault) {
        self.record(queue).faults.lock().unwrap().remove(&fault);
    }
}

impl QueueEngine for MockEngine {
    type Queue = MockQueue;

    fn create(&self, name: &str, options: QueueOptions) -> MockQueue {
        let record = self.record(name);
        *record.options.lock().unwrap() = Some(options.clone());
        MockQueue {
            name: name.to_string(),
            options,
            record,
            listeners: ListenerTable::new(),
        }
    }
}

pub struct MockQueue {
    name: String,
    options: QueueOptions,
    record: Arc<QueueRecord>,
    listeners: ListenerTable,
}

impl MockQueue {
    /// Deliver `event` to the callbacks attached for its kind.
    pub fn emit(&self, event: &QueueEvent) {
        self.listeners.dispatch(event);
    }

    fn enqueue(&self, job: &BulkJob) -> EnqueuedJob {
        let options = self
            .options
            .effective_job_options()
            .merged(&job.options.clone().unwrap_or_default());
        EnqueuedJob {
            id: JobId::new(),
            name: job.name.clone(),
            queue: self.name.clone(),
            payload: job.payload.clone(),
            options,
            state: JobState::Waiting,
            timestamp: Utc::now(),
        }
    }
}

impl QueueHandle for MockQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &QueueOptions {
        &self.options
    }

    async fn add(
        &self,
        name: &str,
        payload: Value,
        options: Option<JobOptions>,
    ) -> EngineResult<EnqueuedJob> {
        self.record.check(Fault::Add)?;
        let job = BulkJob {
            name: name.to_string(),
            payload,
            options,
        };
        self.record.single_adds.fetch_add(1, Ordering::SeqCst);
        let enqueued = self.enqueue(&job);
        self.record.jobs.lock().unwrap().push(job);
        Ok(enqueued)
    }

    async fn add_bulk(&self, jobs: Vec<BulkJob>) -> EngineResult<Vec<EnqueuedJob>> {
        self.record.check(Fault::Add)?;
        self.record.bulk_sizes.lock().unwrap().push(jobs.len());
        let enqueued = jobs.iter().map(|job| self.enqueue(job)).collect();
        self.record.jobs.lock().unwrap().extend(jobs);
        Ok(enqueued)
    }

    async fn wait_until_ready(&self) -> EngineResult<()> {
        self.record.ready_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.record.check(Fault::Ready)
    }

    async fn close(&self) -> EngineResult<()> {
        self.record.close_calls.fetch_add(1, Ordering::SeqCst);
        self.record.check(Fault::Close)?;
        self.listeners.dispatch(&QueueEvent::Closed);
        Ok(())
    }

    async fn count(&self) -> EngineResult<u64> {
        Ok(self.record.jobs.lock().unwrap().len() as u64)
    }

    async fn get_jobs(&self, _states: &[JobState]) -> EngineResult<Vec<EnqueuedJob>> {
        let jobs = self.record.jobs.lock().unwrap();
        Ok(jobs.iter().map(|job| self.enqueue(job)).collect())
    }

    async fn drain(&self, _delayed: bool) -> EngineResult<()> {
        self.record.jobs.lock().unwrap().clear();
        Ok(())
    }

    fn on(&self, kind: QueueEventKind, callback: EventCallback) -> ListenerId {
        self.listeners.add(kind, callback, false)
    }

    fn once(&self, kind: QueueEventKind, callback: EventCallback) -> ListenerId {
        self.listeners.add(kind, callback, true)
    }

    fn off(&self, kind: QueueEventKind, id: ListenerId) -> bool {
        self.listeners.remove(kind, id)
    }

    fn listener_count(&self, kind: QueueEventKind) -> usize {
        self.listeners.count(kind)
    }
}
