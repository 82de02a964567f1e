//! The queue manager facade.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::join_all;
use queue_core::{
    BulkJob, EngineResult, EnqueuedJob, Job, JobName, QueueConfigMap, QueueEngine, QueueEvent,
    QueueEventKind, QueueHandle, QueueName, QueueOptions,
};
use serde::Serialize;

use crate::config::{ManagerConfig, ManagerOptions};
use crate::error::{AggregateError, BranchFailure, LookupError, ManagerError, ManagerResult};
use crate::listeners::{Listener, ListenerRegistry, SubscriptionId};
use crate::registry::QueueRegistry;
use crate::router::JobRouter;
use crate::state::{ConnectionState, ConnectionStatus};

/// The jobs one queue accepted from an `add_jobs` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueBatch<Q> {
    pub queue: Q,
    pub jobs: Vec<EnqueuedJob>,
}

/// Routes typed jobs to a set of queues and manages them as one unit.
///
/// `J` is the job-kind catalog, `Q` the queue catalog, `E` the engine the
/// queues live in. The manager owns every queue handle it creates; callers
/// get shared references through [`QueueManager::get_queue`].
pub struct QueueManager<E: QueueEngine, J, Q> {
    engine: E,
    queues: QueueRegistry<Q, E::Queue>,
    router: JobRouter<J, Q>,
    options: ManagerOptions,
    state: ConnectionState,
    listeners: ListenerRegistry,
}

impl<E, J, Q> QueueManager<E, J, Q>
where
    E: QueueEngine,
    J: JobName,
    Q: QueueName,
{
    /// Create the enabled queues of `queues` on `engine`.
    ///
    /// Handles are created synchronously; call
    /// [`wait_until_ready`](Self::wait_until_ready) before submitting jobs.
    pub fn new(
        queues: &QueueConfigMap<Q>,
        defaults: &QueueOptions,
        router: JobRouter<J, Q>,
        options: ManagerOptions,
        engine: E,
    ) -> Self {
        let registry = QueueRegistry::build(&engine, queues, defaults);
        for (kind, queue) in router.unresolved_against(&registry) {
            tracing::warn!(
                manager = %options.label,
                job = %kind,
                queue = %queue,
                "Job kind routes to a queue that is not enabled"
            );
        }
        tracing::info!(
            manager = %options.label,
            queues = registry.len(),
            routes = router.len(),
            "Queue manager created"
        );

        Self {
            engine,
            queues: registry,
            router,
            state: ConnectionState::new(options.label.clone()),
            options,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Create a manager from a loaded configuration.
    pub fn from_config(config: ManagerConfig<J, Q>, engine: E) -> Self {
        Self::new(
            &config.queues,
            &config.defaults,
            config.routes,
            config.options,
            engine,
        )
    }

    /// Label used in errors and logs.
    pub fn label(&self) -> &str {
        &self.options.label
    }

    /// The engine the queues were created on.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn router(&self) -> &JobRouter<J, Q> {
        &self.router
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Get a queue handle by name; `None` for disabled or unknown queues.
    pub fn get_queue(&self, name: &Q) -> Option<&Arc<E::Queue>> {
        self.queues.get(name)
    }

    /// Names of the created queues, in registry order.
    pub fn queue_names(&self) -> impl Iterator<Item = &Q> {
        self.queues.names()
    }

    /// Destination queue of a job kind.
    pub fn queue_for(&self, kind: &J) -> ManagerResult<(&Q, &Arc<E::Queue>)> {
        let name = self.router.resolve(kind)?;
        let handle = self.queues.get(name).ok_or_else(|| LookupError::UnknownQueue {
            queue: name.to_string(),
        })?;
        Ok((name, handle))
    }

    /// Routes whose queue was not created; submitting those kinds fails.
    pub fn unresolved_routes(&self) -> Vec<(&J, &Q)> {
        self.router.unresolved_against(&self.queues)
    }

    /// Submit one job to the queue its kind routes to.
    pub async fn add_job(&self, job: Job<J>) -> ManagerResult<EnqueuedJob> {
        self.state.ensure_connected()?;
        let (name, handle) = self.queue_for(&job.kind)?;

        let added = handle
            .add(&job.kind.to_string(), job.payload, job.options)
            .await
            .map_err(|source| ManagerError::Engine {
                queue: name.to_string(),
                source,
            })?;

        tracing::debug!(manager = %self.options.label, queue = %name, job = %added.id, "Job added");
        Ok(added)
    }

    /// Submit jobs with one bulk call per destination queue.
    ///
    /// Jobs keep their relative order within a queue; batches come back in
    /// the order their queue first appears in `jobs`. Nothing is submitted if
    /// any job fails to route.
    pub async fn add_jobs(&self, jobs: Vec<Job<J>>) -> ManagerResult<Vec<QueueBatch<Q>>> {
        self.state.ensure_connected()?;

        let mut groups: Vec<(Q, Arc<E::Queue>, Vec<BulkJob>)> = Vec::new();
        let mut slots: HashMap<Q, usize> = HashMap::new();
        for job in jobs {
            let (name, handle) = self.queue_for(&job.kind)?;
            let slot = *slots.entry(name.clone()).or_insert_with(|| {
                groups.push((name.clone(), handle.clone(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].2.push(BulkJob::from(job));
        }

        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let outcomes = join_all(groups.into_iter().map(|(name, handle, jobs)| async move {
            let count = jobs.len();
            let result = handle.add_bulk(jobs).await;
            (name, count, result)
        }))
        .await;

        let mut batches = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (queue, count, result) in outcomes {
            match result {
                Ok(jobs) => {
                    tracing::debug!(
                        manager = %self.options.label,
                        queue = %queue,
                        jobs = count,
                        "Jobs added"
                    );
                    batches.push(QueueBatch { queue, jobs });
                }
                Err(error) => {
                    tracing::warn!(
                        manager = %self.options.label,
                        queue = %queue,
                        %error,
                        "Bulk add failed"
                    );
                    failures.push(BranchFailure {
                        queue: queue.to_string(),
                        error,
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(AggregateError::new("add_jobs", failures).into());
        }
        Ok(batches)
    }

    /// Attach `listener` for `kind` on every queue.
    ///
    /// Keep the returned id to detach the listener with [`off`](Self::off).
    pub fn on(&self, kind: QueueEventKind, listener: Listener<E::Queue>) -> SubscriptionId {
        self.listeners.attach(&self.queues, kind, listener)
    }

    /// Closure form of [`on`](Self::on).
    pub fn on_fn<F>(&self, kind: QueueEventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&Arc<E::Queue>, &QueueEvent) + Send + Sync + 'static,
    {
        self.on(kind, Arc::new(listener))
    }

    /// Attach `listener` for `kind` on every queue, at most one call per queue.
    ///
    /// One-shot listeners cannot be detached with [`off`](Self::off).
    pub fn once(&self, kind: QueueEventKind, listener: Listener<E::Queue>) {
        self.listeners.attach_once(&self.queues, kind, listener);
    }

    /// Closure form of [`once`](Self::once).
    pub fn once_fn<F>(&self, kind: QueueEventKind, listener: F)
    where
        F: Fn(&Arc<E::Queue>, &QueueEvent) + Send + Sync + 'static,
    {
        self.once(kind, Arc::new(listener));
    }

    /// Detach a listener attached with [`on`](Self::on) from every queue.
    pub fn off(&self, kind: QueueEventKind, subscription: SubscriptionId) -> ManagerResult<()> {
        self.listeners.detach(&self.queues, kind, subscription)
    }

    /// Number of live `on()` subscriptions.
    pub fn subscriptions(&self) -> usize {
        self.listeners.len()
    }

    /// Wait for every queue to be ready, then accept jobs.
    ///
    /// The manager is `Connecting` meanwhile and only becomes `Connected` once
    /// every queue reported ready; if any queue fails it goes back to
    /// `Disconnected` and the error lists every failed queue.
    pub async fn wait_until_ready(&self) -> ManagerResult<()> {
        self.state.begin_connect()?;
        tracing::info!(
            manager = %self.options.label,
            queues = self.queues.len(),
            "Connecting queues"
        );

        let result = self
            .fan_out("wait_until_ready", |queue| async move {
                queue.wait_until_ready().await
            })
            .await;

        self.state.finish_connect(result.is_ok());
        result?;

        tracing::info!(manager = %self.options.label, "Queue manager connected");
        Ok(())
    }

    /// Close every queue. The manager is `Closed` from the first moment of
    /// the call, and every queue is closed even if some fail.
    pub async fn close(&self) -> ManagerResult<()> {
        self.state.begin_close()?;
        tracing::info!(manager = %self.options.label, queues = self.queues.len(), "Closing queues");

        self.fan_out("close", |queue| async move { queue.close().await })
            .await?;

        tracing::info!(manager = %self.options.label, "Queue manager closed");
        Ok(())
    }

    /// Run `op` on every queue concurrently and wait for all of them.
    async fn fan_out<F, Fut>(&self, operation: &'static str, op: F) -> Result<(), AggregateError>
    where
        F: Fn(Arc<E::Queue>) -> Fut,
        Fut: Future<Output = EngineResult<()>>,
    {
        let outcomes = join_all(self.queues.iter().map(|(name, handle)| {
            let branch = op(handle.clone());
            async move { (name, branch.await) }
        }))
        .await;

        let failures: Vec<BranchFailure> = outcomes
            .into_iter()
            .filter_map(|(name, result)| {
                result.err().map(|error| {
                    tracing::warn!(
                        manager = %self.options.label,
                        queue = %name,
                        %error,
                        "{} failed",
                        operation
                    );
                    BranchFailure {
                        queue: name.to_string(),
                        error,
                    }
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(operation, failures))
        }
    }
}
