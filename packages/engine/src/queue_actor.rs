//! Queue actor holding the jobs of a single named queue.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::time::Duration;

use chrono::Utc;
use queue_core::{BulkJob, EnqueuedJob, JobId, JobState, QueueEvent, QueueOptions};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::sync::mpsc;

use crate::messages::QueueMessage;

/// Wrapper for queue ordering (lower priority number first, then insertion order).
#[derive(Debug, Clone)]
struct PendingJob {
    job: EnqueuedJob,
    priority: u32,
    seq: i64,
}

impl PartialEq for PendingJob {
    fn eq(&self, other: &Self) -> bool {
        self.job.id == other.job.id
    }
}

impl Eq for PendingJob {}

impl PartialOrd for PendingJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingJob {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest element, so both keys are reversed.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// State for the queue actor.
pub struct QueueActorState {
    name: String,
    options: QueueOptions,
    /// Waiting, prioritized and paused jobs.
    pending: BinaryHeap<PendingJob>,
    /// Delayed jobs by ID, with their ordering keys.
    delayed: HashMap<JobId, PendingJob>,
    paused: bool,
    next_seq: i64,
    /// One event channel per subscribed handle.
    subscribers: HashMap<u64, mpsc::Sender<QueueEvent>>,
    event_capacity: usize,
}

impl QueueActorState {
    /// Create a new queue actor state.
    pub fn new(name: impl Into<String>, options: QueueOptions, event_capacity: usize) -> Self {
        Self {
            name: name.into(),
            options,
            pending: BinaryHeap::new(),
            delayed: HashMap::new(),
            paused: false,
            next_seq: 0,
            subscribers: HashMap::new(),
            event_capacity: event_capacity.max(1),
        }
    }

    /// Deliver an event to every subscriber.
    ///
    /// Waits while a subscriber's buffer is full, so no event is lost.
    /// Subscribers whose receiver is gone are dropped.
    async fn broadcast(&mut self, event: QueueEvent) {
        let mut gone = Vec::new();
        for (id, tx) in &self.subscribers {
            if tx.send(event.clone()).await.is_err() {
                gone.push(*id);
            }
        }
        for id in gone {
            self.subscribers.remove(&id);
        }
    }

    fn ready_state(&self, priority: u32) -> JobState {
        if self.paused {
            JobState::Paused
        } else if priority > 0 {
            JobState::Prioritized
        } else {
            JobState::Waiting
        }
    }

    fn accept(&mut self, bulk: BulkJob) -> Result<PendingJob, String> {
        if bulk.name.is_empty() {
            return Err("job name must not be empty".into());
        }

        let options = match &bulk.options {
            Some(overrides) => self.options.effective_job_options().merged(overrides),
            None => self.options.effective_job_options(),
        };
        let priority = options.priority.unwrap_or(0);
        let delayed = options.delay_ms.is_some_and(|ms| ms > 0);

        self.next_seq += 1;
        let seq = if options.lifo.unwrap_or(false) {
            -self.next_seq
        } else {
            self.next_seq
        };

        let state = if delayed {
            JobState::Delayed
        } else {
            self.ready_state(priority)
        };

        Ok(PendingJob {
            job: EnqueuedJob {
                id: queue_core::JobId::new(),
                name: bulk.name,
                queue: self.name.clone(),
                payload: bulk.payload,
                options,
                state,
                timestamp: Utc::now(),
            },
            priority,
            seq,
        })
    }

    /// Pending jobs in the order they would be served.
    fn ordered_pending(&self) -> Vec<EnqueuedJob> {
        let mut ordered: Vec<PendingJob> = self.pending.clone().into_sorted_vec();
        ordered.reverse();
        ordered.into_iter().map(|p| p.job).collect()
    }

    fn ordered_delayed(&self) -> Vec<EnqueuedJob> {
        let mut delayed: Vec<&PendingJob> = self.delayed.values().collect();
        delayed.sort_by(|a, b| b.cmp(a));
        delayed.into_iter().map(|p| p.job.clone()).collect()
    }

    fn restate_pending(&mut self) {
        let jobs = std::mem::take(&mut self.pending).into_vec();
        self.pending = jobs
            .into_iter()
            .map(|mut p| {
                p.job.state = self.ready_state(p.priority);
                p
            })
            .collect();
    }

    fn find(&self, job_id: JobId) -> Option<&EnqueuedJob> {
        self.pending
            .iter()
            .find(|p| p.job.id == job_id)
            .map(|p| &p.job)
            .or_else(|| self.delayed.get(&job_id).map(|p| &p.job))
    }
}

/// Queue actor that manages a single queue.
pub struct QueueActor;

impl Actor for QueueActor {
    type Msg = QueueMessage;
    type State = QueueActorState;
    type Arguments = QueueActorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!(queue = %args.name, "Starting queue actor");
        Ok(args)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            QueueMessage::Add { jobs, reply } => {
                // Validate the whole batch before accepting any of it.
                let mut accepted = Vec::with_capacity(jobs.len());
                for bulk in jobs {
                    match state.accept(bulk) {
                        Ok(pending) => accepted.push(pending),
                        Err(e) => {
                            tracing::warn!(queue = %state.name, error = %e, "Batch rejected");
                            let _ = reply.send(Err(e.clone()));
                            state.broadcast(QueueEvent::Error { message: e }).await;
                            return Ok(());
                        }
                    }
                }

                let mut added: Vec<EnqueuedJob> = Vec::with_capacity(accepted.len());
                for pending in accepted {
                    let job = pending.job.clone();
                    if job.state == JobState::Delayed {
                        let delay = Duration::from_millis(job.options.delay_ms.unwrap_or(0));
                        let job_id = job.id;
                        let promoter = myself.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            let _ = promoter.send_message(QueueMessage::Promote { job_id });
                        });
                        state.delayed.insert(job_id, pending);
                    } else {
                        state.pending.push(pending);
                    }

                    added.push(job);
                }

                tracing::debug!(queue = %state.name, jobs = added.len(), "Jobs added");
                // Reply first; slow listeners must not hold the caller.
                let _ = reply.send(Ok(added.clone()));
                for job in added {
                    state.broadcast(QueueEvent::Waiting { job }).await;
                }
            }

            QueueMessage::GetJobs { states, reply } => {
                let jobs = state
                    .ordered_pending()
                    .into_iter()
                    .chain(state.ordered_delayed())
                    .filter(|j| states.is_empty() || states.contains(&j.state))
                    .collect();
                let _ = reply.send(jobs);
            }

            QueueMessage::GetJob { job_id, reply } => {
                let _ = reply.send(state.find(job_id).cloned());
            }

            QueueMessage::Count { reply } => {
                let _ = reply.send((state.pending.len() + state.delayed.len()) as u64);
            }

            QueueMessage::Drain { delayed, reply } => {
                let drained: Vec<JobId> = state.pending.drain().map(|p| p.job.id).collect();
                let drained_count = drained.len();
                if !drained.is_empty() {
                    state
                        .broadcast(QueueEvent::Cleaned {
                            job_ids: drained,
                            state: JobState::Waiting,
                        })
                        .await;
                }

                let mut total = drained_count;
                if delayed && !state.delayed.is_empty() {
                    let ids: Vec<JobId> = state.delayed.drain().map(|(id, _)| id).collect();
                    total += ids.len();
                    state
                        .broadcast(QueueEvent::Cleaned {
                            job_ids: ids,
                            state: JobState::Delayed,
                        })
                        .await;
                }

                tracing::debug!(queue = %state.name, removed = total, "Queue drained");
                let _ = reply.send(total);
            }

            QueueMessage::Remove { job_id, reply } => {
                let before = state.pending.len();
                state.pending.retain(|p| p.job.id != job_id);
                let removed =
                    state.pending.len() != before || state.delayed.remove(&job_id).is_some();

                let _ = reply.send(removed);
                if removed {
                    state.broadcast(QueueEvent::Removed { job_id }).await;
                }
            }

            QueueMessage::UpdateProgress {
                job_id,
                progress,
                reply,
            } => {
                let known = state.find(job_id).is_some();
                let _ = reply.send(known);
                if known {
                    state.broadcast(QueueEvent::Progress { job_id, progress }).await;
                }
            }

            QueueMessage::Promote { job_id } => {
                if let Some(mut pending) = state.delayed.remove(&job_id) {
                    pending.job.state = state.ready_state(pending.priority);
                    state.pending.push(pending);
                }
            }

            QueueMessage::Pause { reply } => {
                if !state.paused {
                    state.paused = true;
                    state.restate_pending();
                    state.broadcast(QueueEvent::Paused).await;
                }
                let _ = reply.send(());
            }

            QueueMessage::Resume { reply } => {
                if state.paused {
                    state.paused = false;
                    state.restate_pending();
                    state.broadcast(QueueEvent::Resumed).await;
                }
                let _ = reply.send(());
            }

            QueueMessage::Subscribe { subscriber, reply } => {
                let (tx, rx) = mpsc::channel(state.event_capacity);
                state.subscribers.insert(subscriber, tx);
                let _ = reply.send(rx);
            }

            QueueMessage::Unsubscribe { subscriber, reply } => {
                // Dropping the sender ends the stream after what is buffered.
                state.subscribers.remove(&subscriber);
                let _ = reply.send(());
            }

            QueueMessage::Shutdown => {
                tracing::info!(queue = %state.name, "Shutting down queue actor");
                myself.stop(None);
                return Ok(());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use queue_core::JobOptions;
    use serde_json::json;

    fn bulk(name: &str, options: Option<JobOptions>) -> BulkJob {
        BulkJob {
            name: name.to_string(),
            payload: json!({}),
            options,
        }
    }

    #[test]
    fn pending_order_is_priority_then_fifo() {
        let mut state = QueueActorState::new("q", QueueOptions::default(), 16);
        for (name, options) in [
            ("first", None),
            ("urgent", Some(JobOptions::default().priority(1))),
            ("second", None),
            ("jumped", Some(JobOptions::default().lifo(true))),
        ] {
            let pending = state.accept(bulk(name, options)).unwrap();
            state.pending.push(pending);
        }

        let names: Vec<String> = state.ordered_pending().into_iter().map(|j| j.name).collect();
        assert_eq!(names, vec!["jumped", "first", "second", "urgent"]);
    }

    #[test]
    fn accept_layers_job_options_over_queue_defaults() {
        let options = QueueOptions::default()
            .with_default_job_options(JobOptions::with_attempts(3).priority(2));
        let mut state = QueueActorState::new("q", options, 16);

        let pending = state
            .accept(bulk("job", Some(JobOptions::with_attempts(7))))
            .unwrap();
        assert_eq!(pending.job.options.attempts, Some(7));
        assert_eq!(pending.job.options.priority, Some(2));
        assert_eq!(pending.job.state, JobState::Prioritized);
    }

    #[test]
    fn accept_rejects_empty_names() {
        let mut state = QueueActorState::new("q", QueueOptions::default(), 16);
        assert!(state.accept(bulk("", None)).is_err());
    }
}
