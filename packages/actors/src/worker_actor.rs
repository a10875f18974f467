//! Worker actor for executing jobs.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bridge_core::{Job, JobId};
use futures_util::FutureExt;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use tokio::task::JoinHandle;

use crate::handler::{HandlerResult, JobHandlerRegistry};
use crate::messages::{QueueMessage, WorkerMessage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub operation: String,
    pub queue: ActorRef<QueueMessage>,
    pub handlers: Arc<JobHandlerRegistry>,
    pub poll_interval: Duration,
}

/// State for the worker actor.
pub struct WorkerActorState {
    pub worker_id: String,
    pub operation: String,
    /// Job currently executing in a spawned task.
    pub current_job: Option<JobId>,
    pub queue: ActorRef<QueueMessage>,
    pub handlers: Arc<JobHandlerRegistry>,
    heartbeat: Option<JoinHandle<()>>,
}

impl WorkerActorState {
    pub fn is_idle(&self) -> bool {
        self.current_job.is_none()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run a job's handler with its timeout. Every failure mode becomes an error
/// string; nothing escapes to the caller.
pub async fn run_job(handlers: &JobHandlerRegistry, job: Job) -> HandlerResult {
    let Some(handler) = handlers.get(&job.operation) else {
        return Err(format!("No handler for operation: {}", job.operation));
    };

    let timeout_secs = job.timeout_secs;
    let run = async move { handler.handle(&job).await };

    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        AssertUnwindSafe(run).catch_unwind(),
    )
    .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(panic)) => Err(format!("Job panicked: {}", panic_message(panic.as_ref()))),
        Err(_) => Err(format!("Job timed out after {}s", timeout_secs)),
    }
}

/// Worker actor that pulls jobs from its queue and executes them.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker {} for {}", args.worker_id, args.operation);

        let myself_clone = myself.clone();
        let poll_interval = args.poll_interval;
        let heartbeat = tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;
                if myself_clone.send_message(WorkerMessage::Heartbeat).is_err() {
                    break;
                }
            }
        });

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            operation: args.operation,
            current_job: None,
            queue: args.queue,
            handlers: args.handlers,
            heartbeat: Some(heartbeat),
        })
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        if let Some(heartbeat) = state.heartbeat.take() {
            heartbeat.abort();
        }
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Heartbeat => {
                if !state.is_idle() {
                    return Ok(());
                }

                let result = ractor::rpc::call(
                    &state.queue,
                    |reply| QueueMessage::RequestJob {
                        worker_id: state.worker_id.clone(),
                        reply,
                    },
                    Some(REQUEST_TIMEOUT),
                )
                .await;

                if let Ok(ractor::rpc::CallResult::Success(Some(job))) = result {
                    let job_id = job.id;
                    state.current_job = Some(job_id);

                    let handlers = state.handlers.clone();
                    let queue = state.queue.clone();
                    let worker_id = state.worker_id.clone();
                    let worker = myself.clone();
                    tokio::spawn(async move {
                        let report = match run_job(&handlers, job).await {
                            Ok(result) => QueueMessage::JobCompleted {
                                job_id,
                                worker_id,
                                result,
                            },
                            Err(error) => QueueMessage::JobFailed {
                                job_id,
                                worker_id,
                                error,
                            },
                        };
                        if let Err(e) = queue.send_message(report) {
                            tracing::warn!("Failed to report job {}: {}", job_id, e);
                        }
                        let _ = worker.send_message(WorkerMessage::JobFinished { job_id });
                    });
                }
            }

            WorkerMessage::JobFinished { job_id } => {
                if state.current_job == Some(job_id) {
                    state.current_job = None;
                }
            }

            WorkerMessage::IsIdle { reply } => {
                let _ = reply.send(state.is_idle());
            }

            WorkerMessage::Shutdown => {
                tracing::info!("Shutting down worker: {}", state.worker_id);
                myself.stop(None);
            }
        }

        Ok(())
    }
}
