//! System event log, one append-only list per category.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Database, DbError};

const TABLE: &str = "event_log";

/// One logged event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub payload: Map<String, Value>,
}

impl EventLogEntry {
    /// The entry flattened as `{"timestamp", ...payload}`.
    pub fn to_value(&self) -> Value {
        let mut flat = Map::new();
        flat.insert("timestamp".to_string(), Value::from(self.timestamp.to_rfc3339()));
        flat.extend(self.payload.clone());
        Value::Object(flat)
    }
}

/// Repository for logged system events.
#[derive(Clone)]
pub struct EventLogRepository {
    db: Database,
}

impl EventLogRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append an event under `category`.
    pub async fn append(
        &self,
        category: &str,
        payload: Map<String, Value>,
    ) -> Result<EventLogEntry, DbError> {
        let entry = EventLogEntry {
            category: category.to_string(),
            timestamp: Utc::now(),
            payload,
        };

        let created: Option<EventLogEntry> = self.db.create(TABLE).content(entry).await?;
        created.ok_or_else(|| DbError::Query("Failed to log event".into()))
    }

    /// Events of a category, oldest first.
    pub async fn for_category(&self, category: &str) -> Result<Vec<EventLogEntry>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM event_log WHERE category = $category")
            .bind(("category", category.to_string()))
            .await?;

        let mut entries: Vec<EventLogEntry> = result.take(0)?;
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }
}
