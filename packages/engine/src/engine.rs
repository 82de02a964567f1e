//! The actor engine: a supervisor plus the queues it opens.

use std::time::Duration;

use queue_core::{EngineResult, QueueEngine, QueueOptions};
use ractor::{Actor, ActorRef};

use crate::handle::{ActorQueue, request};
use crate::messages::SupervisorMessage;
use crate::supervisor::Supervisor;

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Buffer size of each handle's event channel. A full buffer holds the
    /// queue actor until the handle catches up; events are never dropped.
    pub event_capacity: usize,
    /// How long a handle waits for an actor to answer.
    pub call_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            call_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Set the call timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// In-process queue engine.
///
/// Cloning shares the same supervisor, so handles created from clones see
/// the same named queues.
#[derive(Clone)]
pub struct ActorEngine {
    supervisor: ActorRef<SupervisorMessage>,
    config: EngineConfig,
}

impl ActorEngine {
    /// Start an engine with default settings.
    pub async fn start() -> Result<Self, ractor::SpawnErr> {
        Self::start_with(EngineConfig::default()).await
    }

    /// Start an engine with the given settings.
    pub async fn start_with(config: EngineConfig) -> Result<Self, ractor::SpawnErr> {
        let (supervisor, _handle) = Actor::spawn(None, Supervisor, config.clone()).await?;
        Ok(Self { supervisor, config })
    }

    /// Names of the queues opened so far.
    pub async fn queue_names(&self) -> EngineResult<Vec<String>> {
        request(
            &self.supervisor,
            |reply| SupervisorMessage::ListQueues { reply },
            &self.config,
        )
        .await
    }

    /// Stop the supervisor and every queue actor.
    pub fn shutdown(&self) {
        let _ = self.supervisor.send_message(SupervisorMessage::Shutdown);
    }
}

impl QueueEngine for ActorEngine {
    type Queue = ActorQueue;

    fn create(&self, name: &str, options: QueueOptions) -> ActorQueue {
        ActorQueue::new(name, options, self.supervisor.clone(), self.config.clone())
    }
}
