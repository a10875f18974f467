//! Job history repository for archived terminal jobs.

use std::collections::HashMap;

use bridge_core::{Job, JobId, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Database, DbError};

const TABLE: &str = "job_history";

/// Job history record for archival.
///
/// Holds enough to rebuild the terminal [`Job`], so polls keep answering
/// after the queue has dropped it from memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHistoryRecord {
    pub job_id: String,
    pub operation: String,
    pub final_status: String,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub timeout_secs: u64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
}

impl JobHistoryRecord {
    /// Build a history record; `None` for jobs that are not terminal.
    pub fn from_job(job: &Job) -> Option<Self> {
        let (final_status, result, error, finished_at) = match &job.status {
            JobStatus::Done {
                finished_at,
                result,
                ..
            } => ("done", Some(result.clone()), None, *finished_at),
            JobStatus::Failed {
                finished_at,
                error,
                ..
            } => ("failed", None, Some(error.clone()), *finished_at),
            _ => return None,
        };
        let started_at = job.status.started_at();
        let duration_ms =
            started_at.map(|s| (finished_at - s).num_milliseconds().max(0) as u64);

        Some(Self {
            job_id: job.id.to_string(),
            operation: job.operation.clone(),
            final_status: final_status.to_string(),
            duration_ms,
            error,
            result,
            payload: job.payload.clone(),
            timeout_secs: job.timeout_secs,
            created_at: job.created_at,
            started_at,
            finished_at,
        })
    }

    /// Rebuild the terminal job this record was archived from.
    pub fn to_job(&self) -> Result<Job, DbError> {
        let id = JobId::parse(&self.job_id)
            .map_err(|e| DbError::Query(format!("Bad archived job id {}: {}", self.job_id, e)))?;

        let status = match (self.final_status.as_str(), self.started_at) {
            ("done", Some(started_at)) => JobStatus::Done {
                started_at,
                finished_at: self.finished_at,
                result: self.result.clone().unwrap_or(Value::Null),
            },
            ("failed", started_at) => JobStatus::Failed {
                started_at,
                finished_at: self.finished_at,
                error: self.error.clone().unwrap_or_default(),
            },
            (other, _) => {
                return Err(DbError::Query(format!(
                    "Archived job {} has unexpected status {}",
                    self.job_id, other
                )));
            }
        };

        Ok(Job {
            id,
            operation: self.operation.clone(),
            payload: self.payload.clone(),
            status,
            timeout_secs: self.timeout_secs,
            created_at: self.created_at,
            updated_at: self.finished_at,
        })
    }
}

/// Repository for archived jobs.
#[derive(Clone)]
pub struct JobHistoryRepository {
    db: Database,
}

impl JobHistoryRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Archive a completed/failed job. Non-terminal jobs are ignored.
    pub async fn archive(&self, job: &Job) -> Result<(), DbError> {
        let Some(history) = JobHistoryRecord::from_job(job) else {
            return Ok(());
        };

        let _: Option<JobHistoryRecord> = self
            .db
            .create((TABLE, job.id.to_string()))
            .content(history)
            .await?;

        Ok(())
    }

    /// Get the archived record of a job.
    pub async fn get(&self, job_id: &str) -> Result<Option<JobHistoryRecord>, DbError> {
        let record: Option<JobHistoryRecord> = self.db.select((TABLE, job_id.to_string())).await?;
        Ok(record)
    }

    /// The archived job, rebuilt.
    pub async fn get_job(&self, job_id: JobId) -> Result<Option<Job>, DbError> {
        self.get(&job_id.to_string())
            .await?
            .map(|record| record.to_job())
            .transpose()
    }

    /// List archived jobs for an operation, newest first.
    pub async fn list(&self, operation: &str, limit: usize) -> Result<Vec<JobHistoryRecord>, DbError> {
        let mut result = self
            .db
            .query(
                r#"
                SELECT * FROM job_history
                WHERE operation = $operation
                ORDER BY finished_at DESC
                LIMIT $limit
                "#,
            )
            .bind(("operation", operation.to_string()))
            .bind(("limit", limit as i64))
            .await?;

        let records: Vec<JobHistoryRecord> = result.take(0)?;
        Ok(records)
    }

    /// Count archived jobs by final status for an operation.
    pub async fn count_by_status(&self, operation: &str) -> Result<HashMap<String, u64>, DbError> {
        let mut result = self
            .db
            .query(
                r#"
                SELECT final_status, count() AS count
                FROM job_history
                WHERE operation = $operation
                GROUP BY final_status
                "#,
            )
            .bind(("operation", operation.to_string()))
            .await?;

        #[derive(Deserialize)]
        struct StatusCount {
            final_status: Option<String>,
            count: i64,
        }

        let counts: Vec<StatusCount> = result.take(0)?;

        let mut map = HashMap::new();
        for count in counts {
            if let Some(status) = count.final_status {
                map.insert(status, count.count as u64);
            }
        }

        Ok(map)
    }
}
