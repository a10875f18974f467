#![allow(clippy::disallowed_methods)]

use std::error::Error;
use std::time::Duration;

use actors::{ActorError, FnHandler, HandlerFuture, JobHandlerRegistry, JobSystem};
use bridge_core::{Job, JobEvent, JobId, JobSnapshot, JobStatus, QueueConfig};
use db::{DbConfig, repositories::JobHistoryRepository};
use serde_json::json;

fn fast_config() -> QueueConfig {
    QueueConfig::default()
        .with_concurrency(2)
        .with_poll_interval(10)
}

fn handlers() -> JobHandlerRegistry {
    let mut registry = JobHandlerRegistry::new();
    registry.register(FnHandler::new("double", |job: &Job| {
        let value = job.payload["n"].as_i64();
        Box::pin(async move {
            match value {
                Some(n) => Ok(json!({"doubled": n * 2})),
                None => Err("missing n".to_string()),
            }
        }) as HandlerFuture
    }));
    registry.register(FnHandler::new("sleepy", |_job: &Job| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(json!("late"))
        }) as HandlerFuture
    }));
    registry.register(FnHandler::new("explode", |_job: &Job| {
        Box::pin(async move {
            if true {
                panic!("handler blew up");
            }
            Ok(json!(null))
        }) as HandlerFuture
    }));
    registry
}

async fn wait_terminal(
    jobs: &JobSystem,
    operation: &str,
    job_id: JobId,
) -> Result<Job, Box<dyn Error>> {
    for _ in 0..300 {
        if let Some(job) = jobs.job(operation, job_id).await?
            && job.status.is_terminal()
        {
            return Ok(job);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Err(format!("job {} never finished", job_id).into())
}

#[tokio::test]
async fn test_job_runs_to_done() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config()).await?;

    let job_id = jobs.enqueue("double", json!({"n": 21})).await?;
    let job = wait_terminal(&jobs, "double", job_id).await?;

    assert_eq!(
        job.snapshot(),
        JobSnapshot::Done {
            result: json!({"doubled": 42})
        }
    );

    // Terminal polls are stable.
    let again = jobs.job("double", job_id).await?.ok_or("job vanished")?;
    assert_eq!(again.snapshot(), job.snapshot());

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_handler_error_marks_job_failed() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config()).await?;

    let job_id = jobs.enqueue("double", json!({})).await?;
    let job = wait_terminal(&jobs, "double", job_id).await?;

    assert_eq!(
        job.snapshot(),
        JobSnapshot::Failed {
            error: "missing n".into()
        }
    );

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_panicking_handler_is_isolated() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config()).await?;

    let bad = jobs.enqueue("explode", json!({})).await?;
    let job = wait_terminal(&jobs, "explode", bad).await?;
    match job.status {
        JobStatus::Failed { error, .. } => assert!(error.contains("handler blew up")),
        other => return Err(format!("unexpected status {:?}", other).into()),
    }

    // Other queues keep working.
    let good = jobs.enqueue("double", json!({"n": 1})).await?;
    let job = wait_terminal(&jobs, "double", good).await?;
    assert_eq!(job.status.as_str(), "done");

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_timeout_marks_job_failed() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config().with_timeout(1)).await?;
    let job_id = jobs.enqueue("sleepy", json!({})).await?;
    let job = wait_terminal(&jobs, "sleepy", job_id).await?;

    match job.status {
        JobStatus::Failed { error, .. } => assert!(error.contains("timed out")),
        other => return Err(format!("unexpected status {:?}", other).into()),
    }

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_handler_fails_job() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config()).await?;

    let job_id = jobs.enqueue("unregistered", json!({})).await?;
    let job = wait_terminal(&jobs, "unregistered", job_id).await?;

    match job.status {
        JobStatus::Failed { error, .. } => {
            assert_eq!(error, "No handler for operation: unregistered")
        }
        other => return Err(format!("unexpected status {:?}", other).into()),
    }

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_unknown_job_and_cross_queue_lookup() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config()).await?;

    assert!(jobs.job("double", JobId::new()).await?.is_none());

    let job_id = jobs.enqueue("double", json!({"n": 2})).await?;
    assert!(jobs.job("sleepy", job_id).await?.is_none());
    assert!(jobs.find_job(job_id).await?.is_some());

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_queue_management_and_stats() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config()).await?;

    let operations: Vec<String> = jobs
        .queues()
        .await?
        .into_iter()
        .map(|q| q.operation)
        .collect();
    assert_eq!(operations, vec!["double", "explode", "sleepy"]);

    let duplicate = jobs.create_queue("double", fast_config()).await;
    assert_eq!(duplicate, Err(ActorError::QueueExists("double".into())));

    let created = jobs
        .create_queue("bounded", fast_config().with_concurrency(0).with_max_queue_size(1))
        .await?;
    assert_eq!(created.config.max_queue_size, Some(1));

    // No workers on this queue, so the first job stays pending.
    let first = jobs.enqueue("bounded", json!({})).await?;
    let full = jobs.enqueue("bounded", json!({})).await;
    assert_eq!(full, Err(ActorError::QueueFull("bounded".into())));

    let pending = jobs.jobs("bounded", Some("pending"), 10).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, first);

    for n in 0..3 {
        let id = jobs.enqueue("double", json!({"n": n})).await?;
        wait_terminal(&jobs, "double", id).await?;
    }
    let info = jobs.queue("double").await?.ok_or("queue missing")?;
    assert_eq!(info.stats.done, 3);
    assert_eq!(info.stats.active(), 0);

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_lifecycle_events_are_broadcast() -> Result<(), Box<dyn Error>> {
    let jobs = JobSystem::start(handlers(), fast_config()).await?;
    let mut events = jobs.subscribe();

    let job_id = jobs.enqueue("double", json!({"n": 4})).await?;
    wait_terminal(&jobs, "double", job_id).await?;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        if event.job_id() == job_id {
            seen.push(event);
        }
    }

    assert_eq!(seen.len(), 3);
    assert!(matches!(seen[0], JobEvent::JobEnqueued { .. }));
    assert!(matches!(seen[1], JobEvent::JobStarted { .. }));
    assert!(matches!(seen[2], JobEvent::JobCompleted { .. }));

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_terminal_jobs_are_archived() -> Result<(), Box<dyn Error>> {
    let database = db::init(&DbConfig::memory()).await?;
    let history = JobHistoryRepository::new(database);
    let jobs =
        JobSystem::start_with_history(handlers(), fast_config(), Some(history.clone())).await?;

    let job_id = jobs.enqueue("double", json!({"n": 5})).await?;
    wait_terminal(&jobs, "double", job_id).await?;

    let mut archived = None;
    for _ in 0..100 {
        archived = history.get(&job_id.to_string()).await?;
        if archived.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let archived = archived.ok_or("job was not archived")?;
    assert_eq!(archived.final_status, "done");
    assert_eq!(archived.operation, "double");

    // Still pollable from memory.
    assert!(jobs.job("double", job_id).await?.is_some());

    jobs.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_evicted_jobs_are_served_from_history() -> Result<(), Box<dyn Error>> {
    let database = db::init(&DbConfig::memory()).await?;
    let history = JobHistoryRepository::new(database);
    let config = fast_config().with_max_retained_jobs(1);
    let jobs = JobSystem::start_with_history(handlers(), config, Some(history)).await?;

    let first = jobs.enqueue("double", json!({"n": 1})).await?;
    let done = wait_terminal(&jobs, "double", first).await?;
    let second = jobs.enqueue("double", json!({"n": 2})).await?;
    wait_terminal(&jobs, "double", second).await?;

    // Only the newest archived job stays in memory.
    let mut in_memory = Vec::new();
    for _ in 0..100 {
        in_memory = jobs.jobs("double", None, 10).await?;
        if in_memory.len() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(in_memory.len(), 1);
    assert_eq!(in_memory[0].id, second);

    let evicted = jobs.job("double", first).await?.ok_or("evicted job not found")?;
    assert_eq!(evicted.snapshot(), done.snapshot());
    assert_eq!(
        evicted.snapshot(),
        JobSnapshot::Done {
            result: json!({"doubled": 2})
        }
    );
    assert_eq!(jobs.find_job(first).await?.map(|j| j.snapshot()), Some(done.snapshot()));
    assert!(jobs.job("sleepy", first).await?.is_none());

    jobs.shutdown().await;
    Ok(())
}
