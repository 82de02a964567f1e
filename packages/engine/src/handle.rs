//! Queue handle backed by a queue actor.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use queue_core::{
    BulkJob, EngineError, EngineResult, EnqueuedJob, EventCallback, JobId, JobOptions, JobState,
    ListenerId, QueueEvent, QueueEventKind, QueueHandle, QueueOptions,
};
use ractor::rpc::CallResult;
use ractor::{ActorRef, Message, RpcReplyPort};
use tokio::sync::{OnceCell, mpsc};
use tokio::task::JoinHandle;

use crate::EngineConfig;
use crate::listeners::ListenerTable;
use crate::messages::{QueueMessage, SupervisorMessage};

/// Send a request to an actor and wait for its reply.
pub(crate) async fn request<M, T, F>(
    actor: &ActorRef<M>,
    build: F,
    config: &EngineConfig,
) -> EngineResult<T>
where
    M: Message + Debug,
    T: Send + 'static,
    F: FnOnce(RpcReplyPort<T>) -> M,
{
    match ractor::rpc::call(actor, build, Some(config.call_timeout)).await {
        Ok(CallResult::Success(value)) => Ok(value),
        Ok(CallResult::Timeout) => Err(EngineError::Timeout),
        Ok(CallResult::SenderError) => Err(EngineError::Actor("reply port dropped".into())),
        Err(e) => Err(EngineError::Unavailable(e.to_string())),
    }
}

static NEXT_SUBSCRIBER: AtomicU64 = AtomicU64::new(1);

/// Task forwarding one handle's event channel to its callbacks.
struct Dispatcher {
    actor: ActorRef<QueueMessage>,
    task: JoinHandle<()>,
}

/// A connection to one named queue of an [`ActorEngine`](crate::ActorEngine).
///
/// The backing actor is opened lazily on first use. Closing the handle
/// delivers the events the queue already emitted to it, then stops event
/// delivery; the queue's jobs stay in place.
pub struct ActorQueue {
    name: String,
    options: QueueOptions,
    supervisor: ActorRef<SupervisorMessage>,
    config: EngineConfig,
    subscriber: u64,
    actor: OnceCell<ActorRef<QueueMessage>>,
    listeners: Arc<ListenerTable>,
    dispatcher: Mutex<Option<Dispatcher>>,
    closed: AtomicBool,
}

impl ActorQueue {
    pub(crate) fn new(
        name: &str,
        options: QueueOptions,
        supervisor: ActorRef<SupervisorMessage>,
        config: EngineConfig,
    ) -> Self {
        Self {
            name: name.to_string(),
            options,
            supervisor,
            config,
            subscriber: NEXT_SUBSCRIBER.fetch_add(1, Ordering::Relaxed),
            actor: OnceCell::new(),
            listeners: Arc::new(ListenerTable::new()),
            dispatcher: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether `close()` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn ensure_open(&self) -> EngineResult<&ActorRef<QueueMessage>> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }

        self.actor
            .get_or_try_init(|| async {
                let actor = request(
                    &self.supervisor,
                    |reply| SupervisorMessage::OpenQueue {
                        name: self.name.clone(),
                        options: self.options.clone(),
                        reply,
                    },
                    &self.config,
                )
                .await?;

                let events = request(
                    &actor,
                    |reply| QueueMessage::Subscribe {
                        subscriber: self.subscriber,
                        reply,
                    },
                    &self.config,
                )
                .await?;
                // Closed while opening: dropping `events` unsubscribes.
                if !self.spawn_dispatcher(&actor, events) {
                    return Err(EngineError::Closed);
                }

                tracing::debug!(queue = %self.name, "Queue handle connected");
                Ok(actor)
            })
            .await
    }

    /// Start forwarding `events` to the callbacks. Returns `false`, and
    /// starts nothing, once the handle is closed.
    fn spawn_dispatcher(
        &self,
        actor: &ActorRef<QueueMessage>,
        mut events: mpsc::Receiver<QueueEvent>,
    ) -> bool {
        // `close` flips `closed` under this lock.
        let mut dispatcher = self.dispatcher.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_closed() {
            return false;
        }

        let listeners = self.listeners.clone();
        let queue = self.name.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                listeners.dispatch(&event);
            }
            tracing::trace!(queue = %queue, "Event dispatcher finished");
        });

        *dispatcher = Some(Dispatcher {
            actor: actor.clone(),
            task,
        });
        true
    }

    /// Unsubscribe from the actor and wait until every event it already
    /// sent to this handle has been dispatched.
    async fn finish_dispatch(&self, dispatcher: Dispatcher) {
        let Dispatcher { actor, task } = dispatcher;
        let unsubscribed = request(
            &actor,
            |reply| QueueMessage::Unsubscribe {
                subscriber: self.subscriber,
                reply,
            },
            &self.config,
        )
        .await;

        if let Err(error) = unsubscribed {
            tracing::warn!(
                queue = %self.name,
                %error,
                "Could not unsubscribe, dropping pending events"
            );
            task.abort();
        }
        if let Err(error) = task.await {
            if !error.is_cancelled() {
                tracing::warn!(queue = %self.name, %error, "Event dispatcher failed");
            }
        }
    }

    /// Pause the queue; new and pending jobs are held as paused.
    pub async fn pause(&self) -> EngineResult<()> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::Pause { reply }, &self.config).await
    }

    /// Resume a paused queue.
    pub async fn resume(&self) -> EngineResult<()> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::Resume { reply }, &self.config).await
    }

    /// Remove one job. Returns whether it was present.
    pub async fn remove(&self, job_id: JobId) -> EngineResult<bool> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::Remove { job_id, reply }, &self.config).await
    }

    /// Report progress for a job. Returns whether the job is known.
    pub async fn update_progress(
        &self,
        job_id: JobId,
        progress: serde_json::Value,
    ) -> EngineResult<bool> {
        let actor = self.ensure_open().await?;
        request(
            actor,
            |reply| QueueMessage::UpdateProgress {
                job_id,
                progress,
                reply,
            },
            &self.config,
        )
        .await
    }

    /// Get a job by ID.
    pub async fn get_job(&self, job_id: JobId) -> EngineResult<Option<EnqueuedJob>> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::GetJob { job_id, reply }, &self.config).await
    }
}

impl QueueHandle for ActorQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &QueueOptions {
        &self.options
    }

    async fn add(
        &self,
        name: &str,
        payload: serde_json::Value,
        options: Option<JobOptions>,
    ) -> EngineResult<EnqueuedJob> {
        let job = BulkJob {
            name: name.to_string(),
            payload,
            options,
        };
        let mut added = self.add_bulk(vec![job]).await?;
        added
            .pop()
            .ok_or_else(|| EngineError::Actor("queue returned no job".into()))
    }

    async fn add_bulk(&self, jobs: Vec<BulkJob>) -> EngineResult<Vec<EnqueuedJob>> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::Add { jobs, reply }, &self.config)
            .await?
            .map_err(EngineError::Rejected)
    }

    async fn wait_until_ready(&self) -> EngineResult<()> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::Count { reply }, &self.config).await?;
        Ok(())
    }

    async fn close(&self) -> EngineResult<()> {
        let dispatcher = {
            let mut dispatcher = self.dispatcher.lock().unwrap_or_else(|e| e.into_inner());
            if self.closed.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            dispatcher.take()
        };

        if let Some(dispatcher) = dispatcher {
            self.finish_dispatch(dispatcher).await;
        }

        self.listeners.dispatch(&QueueEvent::Closed);
        tracing::debug!(queue = %self.name, "Queue handle closed");
        Ok(())
    }

    async fn count(&self) -> EngineResult<u64> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::Count { reply }, &self.config).await
    }

    async fn get_jobs(&self, states: &[JobState]) -> EngineResult<Vec<EnqueuedJob>> {
        let actor = self.ensure_open().await?;
        let states = states.to_vec();
        request(actor, |reply| QueueMessage::GetJobs { states, reply }, &self.config).await
    }

    async fn drain(&self, delayed: bool) -> EngineResult<()> {
        let actor = self.ensure_open().await?;
        request(actor, |reply| QueueMessage::Drain { delayed, reply }, &self.config).await?;
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

impl Drop for ActorQueue {
    fn drop(&mut self) {
        if let Some(dispatcher) = self
            .dispatcher
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            dispatcher.task.abort();
        }
    }
}
