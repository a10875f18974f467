//! Event types for job lifecycle updates and hook payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::JobId;

/// Events emitted by the job system for real-time updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEvent {
    /// A new job was enqueued.
    JobEnqueued {
        job_id: JobId,
        operation: String,
        timestamp: DateTime<Utc>,
    },
    /// A job started executing.
    JobStarted {
        job_id: JobId,
        operation: String,
        worker_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A job completed successfully.
    JobCompleted {
        job_id: JobId,
        operation: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// A job failed.
    JobFailed {
        job_id: JobId,
        operation: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl JobEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobEvent::JobEnqueued { timestamp, .. } => *timestamp,
            JobEvent::JobStarted { timestamp, .. } => *timestamp,
            JobEvent::JobCompleted { timestamp, .. } => *timestamp,
            JobEvent::JobFailed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the job ID associated with this event.
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::JobEnqueued { job_id, .. } => *job_id,
            JobEvent::JobStarted { job_id, .. } => *job_id,
            JobEvent::JobCompleted { job_id, .. } => *job_id,
            JobEvent::JobFailed { job_id, .. } => *job_id,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobEvent::JobEnqueued {
                job_id, operation, ..
            } => format!("Job {} enqueued on {}", job_id, operation),
            JobEvent::JobStarted {
                job_id, worker_id, ..
            } => format!("Job {} started by {}", job_id, worker_id),
            JobEvent::JobCompleted {
                job_id,
                duration_ms,
                ..
            } => format!("Job {} completed in {}ms", job_id, duration_ms),
            JobEvent::JobFailed { job_id, error, .. } => {
                format!("Job {} failed: {}", job_id, error)
            }
        }
    }
}

/// A named notification published on the hook bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HookEvent {
    /// Event identifier, one of [`crate::event_names`] or a module-local name.
    pub name: String,
    /// Opaque payload supplied by the emitter.
    pub data: Value,
    pub emitted_at: DateTime<Utc>,
}

impl HookEvent {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
            emitted_at: Utc::now(),
        }
    }
}
