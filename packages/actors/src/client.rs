//! Handle for talking to a running job system.

use std::sync::Arc;
use std::time::Duration;

use bridge_core::{Job, JobEvent, JobId, QueueConfig, QueueInfo};
use db::repositories::JobHistoryRepository;
use ractor::rpc::CallResult;
use ractor::{Actor, ActorRef, RpcReplyPort};
use serde_json::Value;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;

use crate::handler::JobHandlerRegistry;
use crate::messages::{ActorError, ActorResult, SupervisorMessage};
use crate::supervisor::{Supervisor, SupervisorArgs};

const EVENT_CAPACITY: usize = 1024;
const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// Cloneable handle to the supervisor and its event stream.
#[derive(Clone)]
pub struct JobSystem {
    supervisor: ActorRef<SupervisorMessage>,
    events: broadcast::Sender<JobEvent>,
    /// Answers lookups for jobs the queues have evicted.
    history: Option<JobHistoryRepository>,
    handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl JobSystem {
    /// Start a supervisor with one queue per registered handler.
    pub async fn start(handlers: JobHandlerRegistry, config: QueueConfig) -> ActorResult<Self> {
        Self::start_with_history(handlers, config, None).await
    }

    /// Start a supervisor that archives terminal jobs to `history`.
    pub async fn start_with_history(
        handlers: JobHandlerRegistry,
        config: QueueConfig,
        history: Option<JobHistoryRepository>,
    ) -> ActorResult<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let args = SupervisorArgs {
            handlers,
            default_config: config,
            event_tx: events.clone(),
            history: history.clone(),
        };

        let (supervisor, handle) = Actor::spawn(None, Supervisor, args)
            .await
            .map_err(|e| ActorError::Actor(format!("Failed to start supervisor: {}", e)))?;

        Ok(Self {
            supervisor,
            events,
            history,
            handle: Arc::new(Mutex::new(Some(handle))),
        })
    }

    async fn call<T, F>(&self, build: F) -> ActorResult<T>
    where
        T: Send + 'static,
        F: FnOnce(RpcReplyPort<T>) -> SupervisorMessage,
    {
        match ractor::rpc::call(&self.supervisor, build, Some(RPC_TIMEOUT)).await {
            Ok(CallResult::Success(value)) => Ok(value),
            Ok(CallResult::Timeout) => Err(ActorError::Timeout),
            Ok(CallResult::SenderError) => Err(ActorError::Actor("Reply channel dropped".into())),
            Err(e) => Err(ActorError::Actor(e.to_string())),
        }
    }

    /// Create the queue for an operation with its own config.
    pub async fn create_queue(
        &self,
        operation: impl Into<String>,
        config: QueueConfig,
    ) -> ActorResult<QueueInfo> {
        let operation = operation.into();
        self.call(|reply| SupervisorMessage::CreateQueue {
            operation,
            config: Some(config),
            reply,
        })
        .await?
    }

    /// Enqueue a pending job and return its id without waiting for it to run.
    pub async fn enqueue(&self, operation: &str, payload: Value) -> ActorResult<JobId> {
        let job = Job::new(operation, payload);
        self.call(|reply| SupervisorMessage::EnqueueJob {
            job: Box::new(job),
            reply,
        })
        .await?
    }

    /// Look up a job on one operation's queue, then in the archive.
    pub async fn job(&self, operation: &str, job_id: JobId) -> ActorResult<Option<Job>> {
        let live = self
            .call(|reply| SupervisorMessage::GetJob {
                operation: Some(operation.to_string()),
                job_id,
                reply,
            })
            .await?;
        if live.is_some() {
            return Ok(live);
        }

        let archived = self.archived_job(job_id).await?;
        Ok(archived.filter(|job| job.operation == operation))
    }

    /// Look up a job on any queue, then in the archive.
    pub async fn find_job(&self, job_id: JobId) -> ActorResult<Option<Job>> {
        let live = self
            .call(|reply| SupervisorMessage::GetJob {
                operation: None,
                job_id,
                reply,
            })
            .await?;
        match live {
            Some(job) => Ok(Some(job)),
            None => self.archived_job(job_id).await,
        }
    }

    async fn archived_job(&self, job_id: JobId) -> ActorResult<Option<Job>> {
        let Some(history) = &self.history else {
            return Ok(None);
        };
        history
            .get_job(job_id)
            .await
            .map_err(|e| ActorError::History(e.to_string()))
    }

    /// Jobs of one operation still held in memory, oldest first.
    pub async fn jobs(
        &self,
        operation: &str,
        status_filter: Option<&str>,
        limit: usize,
    ) -> ActorResult<Vec<Job>> {
        let operation = operation.to_string();
        let status_filter = status_filter.map(str::to_string);
        self.call(|reply| SupervisorMessage::ListJobs {
            operation,
            status_filter,
            limit,
            reply,
        })
        .await
    }

    pub async fn queue(&self, operation: &str) -> ActorResult<Option<QueueInfo>> {
        let operation = operation.to_string();
        self.call(|reply| SupervisorMessage::GetQueue { operation, reply })
            .await
    }

    /// All queues, sorted by operation.
    pub async fn queues(&self) -> ActorResult<Vec<QueueInfo>> {
        self.call(|reply| SupervisorMessage::ListQueues { reply })
            .await
    }

    /// Subscribe to job lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.events.subscribe()
    }

    /// Stop all queues and workers and wait for the supervisor to exit.
    pub async fn shutdown(&self) {
        let _ = self.supervisor.send_message(SupervisorMessage::Shutdown);
        if let Some(handle) = self.handle.lock().await.take()
            && let Err(e) = handle.await
        {
            tracing::warn!("Supervisor exited abnormally: {}", e);
        }
    }
}
