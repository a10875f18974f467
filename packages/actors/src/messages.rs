//! Message types for actor communication.

use bridge_core::{Job, JobId, QueueConfig, QueueInfo, QueueStats};
use ractor::RpcReplyPort;
use serde_json::Value;

/// Messages for the QueueActor.
#[derive(Debug)]
pub enum QueueMessage {
    /// Enqueue a new job.
    Enqueue {
        job: Box<Job>,
        reply: RpcReplyPort<Result<JobId, ActorError>>,
    },

    /// Request the next job for a worker.
    RequestJob {
        worker_id: String,
        reply: RpcReplyPort<Option<Job>>,
    },

    /// Report job completion.
    JobCompleted {
        job_id: JobId,
        worker_id: String,
        result: Value,
    },

    /// Report job failure.
    JobFailed {
        job_id: JobId,
        worker_id: String,
        error: String,
    },

    /// A terminal job's history record has been stored.
    JobArchived { job_id: JobId },

    /// Get a job by ID.
    GetJob {
        job_id: JobId,
        reply: RpcReplyPort<Option<Job>>,
    },

    /// List jobs in this queue, oldest first.
    ListJobs {
        status_filter: Option<String>,
        limit: usize,
        reply: RpcReplyPort<Vec<Job>>,
    },

    /// Get queue info.
    GetInfo { reply: RpcReplyPort<QueueInfo> },

    /// Get queue stats.
    GetStats { reply: RpcReplyPort<QueueStats> },

    /// Shutdown the queue.
    Shutdown,
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// A job run spawned by this worker has reported back to the queue.
    JobFinished { job_id: JobId },

    /// Check if worker is idle.
    IsIdle { reply: RpcReplyPort<bool> },

    /// Shutdown the worker.
    Shutdown,

    /// Poll tick: an idle worker asks its queue for work.
    Heartbeat,
}

/// Messages for the Supervisor.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Create the queue for an operation.
    CreateQueue {
        operation: String,
        config: Option<QueueConfig>,
        reply: RpcReplyPort<Result<QueueInfo, ActorError>>,
    },

    /// Enqueue a job on its operation's queue, creating the queue on demand.
    EnqueueJob {
        job: Box<Job>,
        reply: RpcReplyPort<Result<JobId, ActorError>>,
    },

    /// Get a queue by operation.
    GetQueue {
        operation: String,
        reply: RpcReplyPort<Option<QueueInfo>>,
    },

    /// List all queues.
    ListQueues { reply: RpcReplyPort<Vec<QueueInfo>> },

    /// Get a job, from one operation's queue or from any queue.
    GetJob {
        operation: Option<String>,
        job_id: JobId,
        reply: RpcReplyPort<Option<Job>>,
    },

    /// List jobs of one operation.
    ListJobs {
        operation: String,
        status_filter: Option<String>,
        limit: usize,
        reply: RpcReplyPort<Vec<Job>>,
    },

    /// Shutdown all queues and workers.
    Shutdown,
}

/// Result type for job system operations.
pub type ActorResult<T> = Result<T, ActorError>;

/// Error type for actor operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActorError {
    #[error("Queue already exists: {0}")]
    QueueExists(String),

    #[error("Queue is full: {0}")]
    QueueFull(String),

    #[error("Actor error: {0}")]
    Actor(String),

    #[error("Timeout")]
    Timeout,

    #[error("Job history error: {0}")]
    History(String),
}
