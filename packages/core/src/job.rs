//! Job domain types for background operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

/// Unique identifier for a job, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Create a new unique job ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Parse a job ID from a string.
    pub fn parse(s: &str) -> Result<Self, ulid::DecodeError> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current status of a job in its lifecycle.
///
/// `Pending -> Running -> Done | Failed`. Terminal states are never left.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting for a worker.
    #[default]
    Pending,
    /// Job is currently being executed by a worker.
    Running {
        started_at: DateTime<Utc>,
        worker_id: String,
    },
    /// Job completed successfully.
    Done {
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        result: Value,
    },
    /// Job failed, timed out, or had no handler.
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        started_at: Option<DateTime<Utc>>,
        finished_at: DateTime<Utc>,
        error: String,
    },
}

impl JobStatus {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Done { .. } | JobStatus::Failed { .. })
    }

    /// Get a simple status string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running { .. } => "running",
            JobStatus::Done { .. } => "done",
            JobStatus::Failed { .. } => "failed",
        }
    }

    /// When execution started, if it did.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match self {
            JobStatus::Pending => None,
            JobStatus::Running { started_at, .. } | JobStatus::Done { started_at, .. } => {
                Some(*started_at)
            }
            JobStatus::Failed { started_at, .. } => *started_at,
        }
    }
}

/// The polling view of a job: status plus result or error once terminal.
///
/// Serializes as `{"status": "pending"}`, `{"status": "done", "result": ...}`
/// or `{"status": "failed", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobSnapshot {
    Pending,
    Running,
    Done { result: Value },
    Failed { error: String },
}

impl JobSnapshot {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobSnapshot::Done { .. } | JobSnapshot::Failed { .. })
    }
}

impl From<&JobStatus> for JobSnapshot {
    fn from(status: &JobStatus) -> Self {
        match status {
            JobStatus::Pending => JobSnapshot::Pending,
            JobStatus::Running { .. } => JobSnapshot::Running,
            JobStatus::Done { result, .. } => JobSnapshot::Done {
                result: result.clone(),
            },
            JobStatus::Failed { error, .. } => JobSnapshot::Failed {
                error: error.clone(),
            },
        }
    }
}

/// A job represents one run of a long-running operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Operation name (used for routing to handlers, one queue per operation).
    pub operation: String,
    /// Job payload as JSON.
    pub payload: Value,
    /// Current status.
    pub status: JobStatus,
    /// Timeout in seconds for job execution, stamped from the queue's
    /// config on enqueue.
    pub timeout_secs: u64,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the job was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(operation: impl Into<String>, payload: Value) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            operation: operation.into(),
            payload,
            status: JobStatus::Pending,
            timeout_secs: 300,
            created_at: now,
            updated_at: now,
        }
    }

    /// The poll view of this job.
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot::from(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_serializes_with_status_tag() {
        let pending = serde_json::to_value(JobSnapshot::Pending).unwrap();
        assert_eq!(pending, json!({"status": "pending"}));

        let done = serde_json::to_value(JobSnapshot::Done {
            result: json!({"score": 0.5}),
        })
        .unwrap();
        assert_eq!(done, json!({"status": "done", "result": {"score": 0.5}}));

        let failed = serde_json::to_value(JobSnapshot::Failed {
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(failed, json!({"status": "failed", "error": "boom"}));
    }

    #[test]
    fn status_maps_to_snapshot() {
        let now = Utc::now();
        let status = JobStatus::Running {
            started_at: now,
            worker_id: "worker-1".into(),
        };
        assert_eq!(JobSnapshot::from(&status), JobSnapshot::Running);
        assert!(!status.is_terminal());
        assert_eq!(status.started_at(), Some(now));

        let failed = JobStatus::Failed {
            started_at: None,
            finished_at: now,
            error: "no handler".into(),
        };
        assert!(failed.is_terminal());
        assert_eq!(failed.as_str(), "failed");
    }

    #[test]
    fn job_id_round_trips_through_display() {
        let id = JobId::new();
        assert_eq!(JobId::parse(&id.to_string()).unwrap(), id);
        assert!(JobId::parse("J-1").is_err());
    }
}
