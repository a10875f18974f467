#![allow(clippy::disallowed_methods)]

mod common;

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use api::event_names;
use serde_json::json;

use common::{poll_until_terminal, register_hypothesis, setup_bridge};

#[tokio::test]
async fn test_queue_and_poll_full_audit() -> Result<(), Box<dyn Error>> {
    let bridge = setup_bridge().await?;
    let completed = Arc::new(AtomicUsize::new(0));
    let seen = completed.clone();
    bridge
        .hooks
        .subscribe(event_names::FULL_AUDIT_COMPLETED, "counter", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let hypothesis_id = register_hypothesis(&bridge, "Markets dip on Mondays").await?;

    let queued = bridge
        .dispatch_route("queue_full_audit", json!({"hypothesis_id": hypothesis_id}))
        .await?;
    let job_id = queued["job_id"].as_str().ok_or("missing job_id")?.to_string();

    let first = bridge
        .dispatch_route("poll_full_audit", json!({"job_id": job_id}))
        .await?;
    assert!(matches!(
        first["status"].as_str(),
        Some("pending" | "running" | "done")
    ));

    let done = poll_until_terminal(&bridge, "poll_full_audit", &job_id).await?;
    assert_eq!(done["status"], "done");
    assert_eq!(done["result"]["hypothesis_id"], json!(hypothesis_id));
    assert_eq!(done["result"]["text_preview"], "Markets dip on Mondays");
    assert_eq!(done["result"]["history_len"], 1);
    assert_eq!(completed.load(Ordering::SeqCst), 1);

    // Terminal polls never change.
    for _ in 0..3 {
        let again = bridge
            .dispatch_route("poll_full_audit", json!({"job_id": job_id}))
            .await?;
        assert_eq!(again, done);
    }

    // The generic status route finds the job too.
    let status = bridge
        .dispatch_route("job_status", json!({"job_id": job_id}))
        .await?;
    assert_eq!(status, done);

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_audit_of_unknown_hypothesis_fails_as_data() -> Result<(), Box<dyn Error>> {
    let bridge = setup_bridge().await?;

    let queued = bridge
        .dispatch_route("queue_full_audit", json!({"hypothesis_id": "HYP_0_deadbeef"}))
        .await?;
    let job_id = queued["job_id"].as_str().ok_or("missing job_id")?.to_string();

    let failed = poll_until_terminal(&bridge, "poll_full_audit", &job_id).await?;
    assert_eq!(failed["status"], "failed");
    assert!(failed["error"]
        .as_str()
        .is_some_and(|e| e.contains("HYP_0_deadbeef")));
    assert!(failed.get("result").is_none());

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_queue_full_audit_requires_hypothesis_id() -> Result<(), Box<dyn Error>> {
    let bridge = setup_bridge().await?;

    let result = bridge.dispatch_route("queue_full_audit", json!({})).await;
    assert!(result.is_err());

    let queue = bridge.jobs.queue("full_audit").await?.ok_or("no audit queue")?;
    assert_eq!(queue.stats.pending + queue.stats.processed(), 0);

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_queue_and_poll_consensus_forecast() -> Result<(), Box<dyn Error>> {
    let bridge = setup_bridge().await?;

    let payload = json!({
        "validations": [
            {"score": 0.2, "timestamp": "2025-01-01T00:00:00Z"},
            {"score": 0.4, "timestamp": "2025-01-02T00:00:00Z"},
            {"score": 0.6, "timestamp": "2025-01-03T00:00:00Z"},
        ]
    });

    let inline = bridge
        .dispatch_route("forecast_consensus", payload.clone())
        .await?;

    let queued = bridge
        .dispatch_route("queue_consensus_forecast", payload)
        .await?;
    let job_id = queued["job_id"].as_str().ok_or("missing job_id")?.to_string();

    let done = poll_until_terminal(&bridge, "poll_consensus_forecast", &job_id).await?;
    assert_eq!(done["status"], "done");
    assert_eq!(done["result"], inline);
    assert_eq!(done["result"]["trend"], "increasing");

    // Each queue only answers for its own jobs.
    let err = bridge
        .dispatch_route("poll_full_audit", json!({"job_id": job_id}))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "job_not_found");

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_finished_jobs_are_archived() -> Result<(), Box<dyn Error>> {
    let bridge = setup_bridge().await?;
    let history = db::repositories::JobHistoryRepository::new(bridge.db.clone());

    let queued = bridge
        .dispatch_route("queue_consensus_forecast", json!({"validations": []}))
        .await?;
    let job_id = queued["job_id"].as_str().ok_or("missing job_id")?.to_string();
    poll_until_terminal(&bridge, "poll_consensus_forecast", &job_id).await?;

    let mut record = None;
    for _ in 0..50 {
        record = history.get(&job_id).await?;
        if record.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    let record = record.ok_or("job was not archived")?;
    assert_eq!(record.operation, "consensus_forecast");
    assert_eq!(record.final_status, "done");

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_bridge_refuses_workerless_queues() -> Result<(), Box<dyn Error>> {
    let lookup = |key: &str| (key == api::config::ENV_WORKERS).then(|| "0".to_string());
    assert!(api::BridgeConfig::from_lookup(lookup).is_err());

    let config = api::BridgeConfig::default()
        .with_queue(bridge_core::QueueConfig::default().with_concurrency(0));
    let result = api::init_bridge(&config).await;
    assert!(matches!(result, Err(api::InitError::Config(_))));
    Ok(())
}

#[tokio::test]
async fn test_queue_and_poll_coordination_analysis() -> Result<(), Box<dyn Error>> {
    let bridge = setup_bridge().await?;
    let runs = Arc::new(AtomicUsize::new(0));
    let seen = runs.clone();
    bridge
        .hooks
        .subscribe(event_names::COORDINATION_ANALYSIS_RUN, "counter", move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

    let validations: Vec<_> = ["a", "b", "c"]
        .iter()
        .flat_map(|validator| {
            ["h1", "h2"].map(|hypothesis| {
                json!({"validator_id": validator, "hypothesis_id": hypothesis, "score": 0.5})
            })
        })
        .collect();
    let payload = json!({ "validations": validations });

    let inline = bridge
        .dispatch_route("coordination_analysis", payload.clone())
        .await?;
    assert_eq!(inline["graph"]["communities"], json!([["a", "b", "c"]]));

    let queued = bridge
        .dispatch_route("queue_coordination_analysis", payload)
        .await?;
    let job_id = queued["job_id"].as_str().ok_or("missing job_id")?.to_string();

    let done = poll_until_terminal(&bridge, "poll_coordination_analysis", &job_id).await?;
    assert_eq!(done["status"], "done");
    assert_eq!(done["result"], inline);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    let rejected = bridge
        .dispatch_route("queue_coordination_analysis", json!({"validations": "all"}))
        .await;
    assert!(rejected.is_err());

    bridge.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_polls_outlive_in_memory_retention() -> Result<(), Box<dyn Error>> {
    let config = api::BridgeConfig::default().with_queue(
        bridge_core::QueueConfig::default()
            .with_poll_interval(10)
            .with_max_retained_jobs(1),
    );
    let bridge = api::init_bridge(&config).await?;

    let mut finished = Vec::new();
    for n in 0..3 {
        let payload = json!({"validations": [
            {"score": 0.1 * f64::from(n), "timestamp": "2025-01-01T00:00:00Z"},
            {"score": 0.5, "timestamp": "2025-01-02T00:00:00Z"},
        ]});
        let queued = bridge
            .dispatch_route("queue_consensus_forecast", payload)
            .await?;
        let job_id = queued["job_id"].as_str().ok_or("missing job_id")?.to_string();
        let done = poll_until_terminal(&bridge, "poll_consensus_forecast", &job_id).await?;
        finished.push((job_id, done));
    }

    // Wait until the queue has dropped the older jobs from memory.
    for _ in 0..100 {
        let held = bridge.jobs.jobs("consensus_forecast", None, 10).await?;
        if held.len() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(bridge.jobs.jobs("consensus_forecast", None, 10).await?.len(), 1);

    for (job_id, done) in &finished {
        let again = bridge
            .dispatch_route("poll_consensus_forecast", json!({"job_id": job_id}))
            .await?;
        assert_eq!(&again, done);
    }

    let history = bridge
        .dispatch_route("job_history", json!({"operation": "consensus_forecast", "limit": 2}))
        .await?;
    assert_eq!(history["counts"], json!({"done": 3}));
    let listed = history["jobs"].as_array().ok_or("jobs not a list")?;
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|job| job["status"] == "done"));

    bridge.shutdown().await;
    Ok(())
}
