#![allow(dead_code)]

use std::error::Error;
use std::time::Duration;

use api::{Bridge, BridgeConfig, init_bridge};
use bridge_core::QueueConfig;
use serde_json::{Value, json};

/// Fresh bridge over an in-memory store with fast-polling workers.
pub async fn setup_bridge() -> Result<Bridge, Box<dyn Error>> {
    let config = BridgeConfig::default().with_queue(
        QueueConfig::default()
            .with_concurrency(2)
            .with_poll_interval(10),
    );
    Ok(init_bridge(&config).await?)
}

/// Poll `poll_route` until the job reaches a terminal status.
pub async fn poll_until_terminal(
    bridge: &Bridge,
    poll_route: &str,
    job_id: &str,
) -> Result<Value, Box<dyn Error>> {
    for _ in 0..300 {
        let snapshot = bridge
            .dispatch_route(poll_route, json!({ "job_id": job_id }))
            .await?;
        if matches!(snapshot["status"].as_str(), Some("done" | "failed")) {
            return Ok(snapshot);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Err(format!("job {} never finished", job_id).into())
}

pub async fn register_hypothesis(bridge: &Bridge, text: &str) -> Result<String, Box<dyn Error>> {
    let result = bridge
        .dispatch_route("register_hypothesis", json!({ "text": text }))
        .await?;
    let id = result["hypothesis_id"]
        .as_str()
        .ok_or("missing hypothesis_id")?;
    Ok(id.to_string())
}
