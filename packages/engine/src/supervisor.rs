//! Supervisor actor owning every queue actor of an engine.

use std::collections::HashMap;

use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};

use crate::EngineConfig;
use crate::messages::{QueueMessage, SupervisorMessage};
use crate::queue_actor::{QueueActor, QueueActorState};

/// State for the supervisor actor.
pub struct SupervisorState {
    /// Queue actors by queue name.
    pub queues: HashMap<String, ActorRef<QueueMessage>>,
    config: EngineConfig,
}

impl SupervisorState {
    /// Create a new supervisor state.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            queues: HashMap::new(),
            config,
        }
    }
}

/// Supervisor actor that manages all queues.
pub struct Supervisor;

impl Actor for Supervisor {
    type Msg = SupervisorMessage;
    type State = SupervisorState;
    type Arguments = EngineConfig;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting queue engine supervisor");
        Ok(SupervisorState::new(args))
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::OpenQueue {
                name,
                options,
                reply,
            } => {
                // The first opener's options win; later handles share the actor.
                if let Some(queue_ref) = state.queues.get(&name) {
                    let _ = reply.send(queue_ref.clone());
                    return Ok(());
                }

                let queue_state =
                    QueueActorState::new(name.clone(), options, state.config.event_capacity);
                let (actor, _handle) =
                    Actor::spawn_linked(None, QueueActor, queue_state, myself.get_cell())
                        .await
                        .map_err(|e| {
                            ActorProcessingErr::from(format!(
                                "Failed to spawn queue {}: {}",
                                name, e
                            ))
                        })?;

                tracing::debug!(queue = %name, "Queue opened");
                state.queues.insert(name, actor.clone());
                let _ = reply.send(actor);
            }

            SupervisorMessage::ListQueues { reply } => {
                let mut names: Vec<String> = state.queues.keys().cloned().collect();
                names.sort();
                let _ = reply.send(names);
            }

            SupervisorMessage::Shutdown => {
                tracing::info!("Shutting down queue engine supervisor");
                for queue_ref in state.queues.values() {
                    let _ = queue_ref.send_message(QueueMessage::Shutdown);
                }
                state.queues.clear();
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorTerminated(cell, _, reason) => {
                state.queues.retain(|_, queue_ref| queue_ref.get_id() != cell.get_id());
                tracing::debug!(actor = %cell.get_id(), ?reason, "Queue actor terminated");
            }
            SupervisionEvent::ActorFailed(cell, error) => {
                state.queues.retain(|_, queue_ref| queue_ref.get_id() != cell.get_id());
                tracing::warn!(actor = %cell.get_id(), %error, "Queue actor failed");
            }
            _ => {}
        }
        Ok(())
    }
}
