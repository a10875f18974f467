//! Supervisor actor for managing all queues and workers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bridge_core::{JobEvent, QueueConfig, QueueInfo};
use db::repositories::JobHistoryRepository;
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use tokio::sync::broadcast;

use crate::handler::JobHandlerRegistry;
use crate::messages::{ActorError, QueueMessage, SupervisorMessage, WorkerMessage};
use crate::queue_actor::{QueueActor, QueueActorState};
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// Startup arguments for the supervisor.
pub struct SupervisorArgs {
    pub handlers: JobHandlerRegistry,
    /// Config used for queues created without an explicit one.
    pub default_config: QueueConfig,
    pub event_tx: broadcast::Sender<JobEvent>,
    pub history: Option<JobHistoryRepository>,
}

struct QueueEntry {
    actor: ActorRef<QueueMessage>,
    workers: Vec<ActorRef<WorkerMessage>>,
}

/// State for the supervisor actor.
pub struct SupervisorState {
    queues: HashMap<String, QueueEntry>,
    handlers: Arc<JobHandlerRegistry>,
    default_config: QueueConfig,
    event_tx: broadcast::Sender<JobEvent>,
    history: Option<JobHistoryRepository>,
    worker_counter: u64,
    shutting_down: bool,
}

impl SupervisorState {
    fn next_worker_id(&mut self, operation: &str) -> String {
        self.worker_counter += 1;
        format!("{}-worker-{}", operation, self.worker_counter)
    }
}

async fn spawn_queue(
    myself: &ActorRef<SupervisorMessage>,
    state: &mut SupervisorState,
    operation: &str,
    config: QueueConfig,
) -> Result<ActorRef<QueueMessage>, ActorError> {
    let queue_state = QueueActorState::new(operation, config.clone(), state.event_tx.clone())
        .with_history(state.history.clone());

    let (actor, _handle) = Actor::spawn_linked(None, QueueActor, queue_state, myself.get_cell())
        .await
        .map_err(|e| ActorError::Actor(format!("Failed to spawn queue: {}", e)))?;

    let mut workers = Vec::with_capacity(config.concurrency as usize);
    for _ in 0..config.concurrency {
        let args = WorkerArgs {
            worker_id: state.next_worker_id(operation),
            operation: operation.to_string(),
            queue: actor.clone(),
            handlers: state.handlers.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        };

        match Actor::spawn_linked(None, WorkerActor, args, myself.get_cell()).await {
            Ok((worker, _)) => workers.push(worker),
            Err(e) => tracing::error!("Failed to spawn worker for {}: {}", operation, e),
        }
    }

    state.queues.insert(
        operation.to_string(),
        QueueEntry {
            actor: actor.clone(),
            workers,
        },
    );

    Ok(actor)
}

async fn queue_info(queue: &ActorRef<QueueMessage>) -> Option<QueueInfo> {
    let (tx, rx) = ractor::concurrency::oneshot();
    queue
        .send_message(QueueMessage::GetInfo { reply: tx.into() })
        .ok()?;
    rx.await.ok()
}

/// Supervisor actor that owns one queue per operation.
pub struct Supervisor;

impl Actor for Supervisor {
    type Msg = SupervisorMessage;
    type State = SupervisorState;
    type Arguments = SupervisorArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting job queue supervisor");

        let mut state = SupervisorState {
            queues: HashMap::new(),
            handlers: Arc::new(args.handlers),
            default_config: args.default_config,
            event_tx: args.event_tx,
            history: args.history,
            worker_counter: 0,
            shutting_down: false,
        };

        for operation in state.handlers.operations() {
            let config = state.default_config.clone();
            spawn_queue(&myself, &mut state, &operation, config).await?;
        }

        Ok(state)
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::CreateQueue {
                operation,
                config,
                reply,
            } => {
                if state.queues.contains_key(&operation) {
                    let _ = reply.send(Err(ActorError::QueueExists(operation)));
                    return Ok(());
                }

                let config = config.unwrap_or_else(|| state.default_config.clone());
                let result = match spawn_queue(&myself, state, &operation, config).await {
                    Ok(actor) => queue_info(&actor)
                        .await
                        .ok_or_else(|| ActorError::Actor("Queue did not respond".into())),
                    Err(e) => Err(e),
                };
                let _ = reply.send(result);
            }

            SupervisorMessage::EnqueueJob { job, reply } => {
                let existing = state.queues.get(&job.operation).map(|q| q.actor.clone());
                let queue = match existing {
                    Some(queue) => queue,
                    None => {
                        let config = state.default_config.clone();
                        match spawn_queue(&myself, state, &job.operation, config).await {
                            Ok(queue) => queue,
                            Err(e) => {
                                let _ = reply.send(Err(e));
                                return Ok(());
                            }
                        }
                    }
                };

                // The queue answers the caller directly.
                if let Err(e) = queue.send_message(QueueMessage::Enqueue { job, reply }) {
                    tracing::warn!("Failed to forward job to queue: {}", e);
                }
            }

            SupervisorMessage::GetQueue { operation, reply } => {
                let info = match state.queues.get(&operation) {
                    Some(entry) => queue_info(&entry.actor).await,
                    None => None,
                };
                let _ = reply.send(info);
            }

            SupervisorMessage::ListQueues { reply } => {
                let mut queues = Vec::new();
                for entry in state.queues.values() {
                    if let Some(info) = queue_info(&entry.actor).await {
                        queues.push(info);
                    }
                }
                queues.sort_by(|a, b| a.operation.cmp(&b.operation));
                let _ = reply.send(queues);
            }

            SupervisorMessage::GetJob {
                operation,
                job_id,
                reply,
            } => {
                let candidates: Vec<&QueueEntry> = match &operation {
                    Some(op) => state.queues.get(op).into_iter().collect(),
                    None => state.queues.values().collect(),
                };

                for entry in candidates {
                    let (tx, rx) = ractor::concurrency::oneshot();
                    if entry
                        .actor
                        .send_message(QueueMessage::GetJob {
                            job_id,
                            reply: tx.into(),
                        })
                        .is_ok()
                        && let Ok(Some(job)) = rx.await
                    {
                        let _ = reply.send(Some(job));
                        return Ok(());
                    }
                }
                let _ = reply.send(None);
            }

            SupervisorMessage::ListJobs {
                operation,
                status_filter,
                limit,
                reply,
            } => match state.queues.get(&operation) {
                Some(entry) => {
                    if let Err(e) = entry.actor.send_message(QueueMessage::ListJobs {
                        status_filter,
                        limit,
                        reply,
                    }) {
                        tracing::warn!("Failed to list jobs for {}: {}", operation, e);
                    }
                }
                None => {
                    let _ = reply.send(Vec::new());
                }
            },

            SupervisorMessage::Shutdown => {
                tracing::info!("Shutting down supervisor");
                state.shutting_down = true;
                for entry in state.queues.values() {
                    for worker in &entry.workers {
                        let _ = worker.send_message(WorkerMessage::Shutdown);
                    }
                    let _ = entry.actor.send_message(QueueMessage::Shutdown);
                }
                myself.stop(None);
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
                if state.shutting_down {
                    tracing::debug!("Child actor {} stopped", cell.get_id());
                } else {
                    tracing::warn!("Child actor {} terminated: {:?}", cell.get_id(), reason);
                }
                state.queues.retain(|_, entry| entry.actor.get_id() != cell.get_id());
            }
            SupervisionEvent::ActorFailed(cell, error) => {
                tracing::error!("Child actor {} failed: {}", cell.get_id(), error);
                state.queues.retain(|_, entry| entry.actor.get_id() != cell.get_id());
            }
            _ => {}
        }
        Ok(())
    }
}
