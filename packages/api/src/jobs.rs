//! Glue between routes and the job system: `queue_*` and `poll_*` helpers.

use std::future::Future;

use actors::{HandlerFuture, JobHandler, JobSystem};
use bridge_core::{Job, JobId};
use serde_json::{Value, json};

use crate::error::HandlerError;

/// Enqueue `payload` for `operation` and return `{job_id}` immediately.
pub async fn queue_job(
    jobs: &JobSystem,
    operation: &str,
    payload: Value,
) -> Result<Value, HandlerError> {
    let job_id = jobs.enqueue(operation, payload).await?;
    tracing::info!(operation, %job_id, "Queued job");
    Ok(json!({ "job_id": job_id.to_string() }))
}

/// Read `job_id` from a poll payload. A malformed id is reported as an
/// unknown job.
pub fn job_id_from(payload: &Value) -> Result<JobId, HandlerError> {
    let raw = payload
        .get("job_id")
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerError::invalid("job_id is required"))?;
    JobId::parse(raw).map_err(|_| HandlerError::JobNotFound(raw.to_string()))
}

/// Snapshot of a job, looked up on `operation`'s queue or on every queue.
pub async fn poll_job(
    jobs: &JobSystem,
    operation: Option<&str>,
    payload: &Value,
) -> Result<Value, HandlerError> {
    let job_id = job_id_from(payload)?;
    let job = match operation {
        Some(operation) => jobs.job(operation, job_id).await?,
        None => jobs.find_job(job_id).await?,
    };
    let job = job.ok_or_else(|| HandlerError::JobNotFound(job_id.to_string()))?;
    Ok(serde_json::to_value(job.snapshot())?)
}

/// A job operation backed by an async function of the payload.
pub struct Operation<F> {
    name: String,
    run: F,
}

impl<F, Fut> Operation<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

impl<F, Fut> JobHandler for Operation<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    fn operation(&self) -> &str {
        &self.name
    }

    fn handle(&self, job: &Job) -> HandlerFuture {
        let run = (self.run)(job.payload.clone());
        Box::pin(async move { run.await.map_err(|e| e.to_string()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_parsing() {
        assert!(matches!(
            job_id_from(&json!({})),
            Err(HandlerError::InvalidPayload(_))
        ));
        assert!(matches!(
            job_id_from(&json!({"job_id": "not-a-ulid"})),
            Err(HandlerError::JobNotFound(id)) if id == "not-a-ulid"
        ));
        let id = JobId::new();
        assert_eq!(
            job_id_from(&json!({"job_id": id.to_string()})).ok(),
            Some(id)
        );
    }
}
