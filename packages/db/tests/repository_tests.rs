#![allow(clippy::disallowed_methods)]

mod common;

use bridge_core::{BridgeRecord, Hypothesis, Job, JobStatus};
use chrono::Utc;
use serde_json::json;
use std::error::Error;

use db::{
    DbError,
    repositories::{
        BridgeRepository, EventLogRepository, FollowAction, FollowRepository,
        HypothesisRepository, JobHistoryRepository,
    },
};

fn bridge_record(coin_id: &str, universe: &str) -> BridgeRecord {
    BridgeRecord {
        coin_id: coin_id.to_string(),
        source_universe: universe.to_string(),
        source_coin: format!("{}-origin", coin_id),
        proof: "sig:abc".to_string(),
    }
}

#[tokio::test]
async fn test_hypothesis_repository() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;
    let repo = HypothesisRepository::new(db);

    let first = Hypothesis::register("Markets follow weather", Some(&json!({"src": "test"})));
    let created = repo.create(&first).await?;
    assert_eq!(created.hypothesis_id, first.hypothesis_id);
    assert_eq!(created.metadata(), json!({"src": "test"}));

    let mut loaded = repo.get(&first.hypothesis_id).await?;
    assert_eq!(loaded.status, "open");
    assert_eq!(loaded.history.len(), 1);

    loaded.apply_score(0.75, None, Some("manual"));
    let updated = repo.update(&loaded).await?;
    assert_eq!(updated.score, 0.75);
    assert_eq!(updated.history.len(), 2);

    let missing = repo.get("HYP_0_deadbeef").await;
    assert!(matches!(missing, Err(DbError::NotFound(_))));

    let mut low = Hypothesis::register("Low confidence", None);
    low.apply_score(0.1, None, None);
    repo.create(&low).await?;
    let mut high = Hypothesis::register("High confidence", None);
    high.apply_score(0.9, None, None);
    repo.create(&high).await?;

    let top = repo.top_by_score(2).await?;
    let ids: Vec<&str> = top.iter().map(|h| h.hypothesis_id.as_str()).collect();
    assert_eq!(ids, vec![high.hypothesis_id.as_str(), first.hypothesis_id.as_str()]);

    loaded.apply_score(0.75, Some("validated"), None);
    repo.update(&loaded).await?;
    let open = repo.with_status("open").await?;
    let mut open_ids: Vec<&str> = open.iter().map(|h| h.hypothesis_id.as_str()).collect();
    open_ids.sort();
    let mut expected = vec![low.hypothesis_id.as_str(), high.hypothesis_id.as_str()];
    expected.sort();
    assert_eq!(open_ids, expected);

    Ok(())
}

#[tokio::test]
async fn test_bridge_repository() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;
    let repo = BridgeRepository::new(db);

    assert!(!repo.exists("coin-1").await?);
    assert!(repo.for_coin("coin-1").await?.is_empty());

    repo.insert(&bridge_record("coin-1", "alpha")).await?;
    repo.insert(&bridge_record("coin-2", "beta")).await?;

    assert!(repo.exists("coin-1").await?);
    let records = repo.for_coin("coin-1").await?;
    assert_eq!(records, vec![bridge_record("coin-1", "alpha")]);

    let duplicate = repo.insert(&bridge_record("coin-1", "gamma")).await;
    assert!(duplicate.is_err());
    assert_eq!(repo.for_coin("coin-1").await?[0].source_universe, "alpha");

    let from_beta = repo.from_universe("beta").await?;
    assert_eq!(from_beta.len(), 1);
    assert_eq!(from_beta[0].coin_id, "coin-2");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bridge_register_is_first_wins() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;
    let repo = BridgeRepository::new(db);
    let other = repo.clone();

    let first = bridge_record("coin-9", "alpha");
    let second = bridge_record("coin-9", "beta");
    let (a, b) = tokio::join!(repo.register(&first), other.register(&second));
    let (a, b) = (a?, b?);

    assert!(a ^ b, "exactly one registration should win");
    let stored = repo.get("coin-9").await?.ok_or("coin-9 not stored")?;
    let winner = if a { first } else { second };
    assert_eq!(stored, winner);
    assert!(!repo.register(&bridge_record("coin-9", "gamma")).await?);

    Ok(())
}

#[tokio::test]
async fn test_follow_repository() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;
    let repo = FollowRepository::new(db);

    assert_eq!(repo.toggle("alice", "carol").await?, FollowAction::Followed);
    assert_eq!(repo.toggle("bob", "carol").await?, FollowAction::Followed);
    assert_eq!(repo.followers("carol").await?, vec!["alice", "bob"]);
    assert_eq!(repo.following("alice").await?, vec!["carol"]);

    assert_eq!(repo.toggle("alice", "carol").await?, FollowAction::Unfollowed);
    assert_eq!(repo.followers("carol").await?, vec!["bob"]);
    assert!(repo.following("alice").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_job_history_repository() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;
    let repo = JobHistoryRepository::new(db);
    let started = Utc::now();

    let mut done = Job::new("audit", json!({}));
    done.status = JobStatus::Done {
        started_at: started,
        finished_at: started + chrono::Duration::milliseconds(40),
        result: json!({"ok": true}),
    };
    let mut failed = Job::new("audit", json!({}));
    failed.status = JobStatus::Failed {
        started_at: Some(started),
        finished_at: started + chrono::Duration::milliseconds(5),
        error: "boom".to_string(),
    };
    let pending = Job::new("audit", json!({}));

    repo.archive(&done).await?;
    repo.archive(&failed).await?;
    repo.archive(&pending).await?;

    let record = repo
        .get(&done.id.to_string())
        .await?
        .ok_or("done job not archived")?;
    assert_eq!(record.final_status, "done");
    assert_eq!(record.duration_ms, Some(40));

    assert!(repo.get(&pending.id.to_string()).await?.is_none());

    let restored = repo.get_job(done.id).await?.ok_or("done job not restored")?;
    assert_eq!(restored.id, done.id);
    assert_eq!(restored.snapshot(), done.snapshot());
    let restored = repo.get_job(failed.id).await?.ok_or("failed job not restored")?;
    assert_eq!(restored.snapshot(), failed.snapshot());
    assert!(repo.get_job(pending.id).await?.is_none());

    let listed = repo.list("audit", 10).await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].job_id, done.id.to_string());
    assert_eq!(listed[1].error.as_deref(), Some("boom"));

    let counts = repo.count_by_status("audit").await?;
    assert_eq!(counts.get("done"), Some(&1));
    assert_eq!(counts.get("failed"), Some(&1));
    assert!(repo.list("other", 10).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_event_log_repository() -> Result<(), Box<dyn Error>> {
    let db = common::setup_db().await?;
    let repo = EventLogRepository::new(db);

    let object = |value: serde_json::Value| value.as_object().cloned().unwrap_or_default();
    let first = repo.append("deploy", object(json!({"version": "1.0"}))).await?;
    repo.append("deploy", object(json!({"version": "1.1"}))).await?;
    repo.append("audit", object(json!({"actor": "alice"}))).await?;

    let deploys = repo.for_category("deploy").await?;
    assert_eq!(deploys.len(), 2);
    assert_eq!(deploys[0].payload, first.payload);
    assert_eq!(deploys[0].category, "deploy");
    assert_eq!(deploys[1].payload["version"], "1.1");

    let flat = first.to_value();
    assert_eq!(flat["version"], "1.0");
    assert!(flat["timestamp"].is_string());

    assert!(repo.for_category("missing").await?.is_empty());
    Ok(())
}
