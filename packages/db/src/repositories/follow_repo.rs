//! Follow graph repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::{Database, DbError};

const TABLE: &str = "follow";

/// A directed follow edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub follower: String,
    pub followee: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a follow toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowAction {
    Followed,
    Unfollowed,
}

impl FollowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowAction::Followed => "followed",
            FollowAction::Unfollowed => "unfollowed",
        }
    }
}

/// Repository for follow edges.
#[derive(Clone)]
pub struct FollowRepository {
    db: Database,
    write_lock: Arc<Mutex<()>>,
}

fn edge_id(follower: &str, followee: &str) -> String {
    format!("{}:{}", follower, followee)
}

impl FollowRepository {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Follow `followee` if not yet followed, otherwise unfollow.
    ///
    /// Toggles are serialized, so concurrent calls on one edge alternate.
    pub async fn toggle(&self, follower: &str, followee: &str) -> Result<FollowAction, DbError> {
        let _guard = self.write_lock.lock().await;
        let id = edge_id(follower, followee);
        let existing: Option<FollowEdge> = self.db.select((TABLE, id.clone())).await?;

        if existing.is_some() {
            let _: Option<FollowEdge> = self.db.delete((TABLE, id)).await?;
            return Ok(FollowAction::Unfollowed);
        }

        let edge = FollowEdge {
            follower: follower.to_string(),
            followee: followee.to_string(),
            created_at: Utc::now(),
        };
        let created: Option<FollowEdge> = self.db.create((TABLE, id)).content(edge).await?;
        created
            .map(|_| FollowAction::Followed)
            .ok_or_else(|| DbError::Query("Failed to create follow edge".into()))
    }

    /// Usernames following `username`, sorted.
    pub async fn followers(&self, username: &str) -> Result<Vec<String>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM follow WHERE followee = $username")
            .bind(("username", username.to_string()))
            .await?;

        let edges: Vec<FollowEdge> = result.take(0)?;
        let mut names: Vec<String> = edges.into_iter().map(|e| e.follower).collect();
        names.sort();
        Ok(names)
    }

    /// Usernames `username` follows, sorted.
    pub async fn following(&self, username: &str) -> Result<Vec<String>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM follow WHERE follower = $username")
            .bind(("username", username.to_string()))
            .await?;

        let edges: Vec<FollowEdge> = result.take(0)?;
        let mut names: Vec<String> = edges.into_iter().map(|e| e.followee).collect();
        names.sort();
        Ok(names)
    }
}
