//! Hypothesis repository.

use bridge_core::Hypothesis;

use crate::{Database, DbError};

const TABLE: &str = "hypothesis";

/// Repository for hypothesis persistence operations.
#[derive(Clone)]
pub struct HypothesisRepository {
    db: Database,
}

impl HypothesisRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a newly registered hypothesis under its own id.
    pub async fn create(&self, hypothesis: &Hypothesis) -> Result<Hypothesis, DbError> {
        let record: Option<Hypothesis> = self
            .db
            .create((TABLE, hypothesis.hypothesis_id.clone()))
            .content(hypothesis.clone())
            .await?;

        record.ok_or_else(|| DbError::Query("Failed to create hypothesis".into()))
    }

    /// Get a hypothesis by id.
    pub async fn get(&self, id: &str) -> Result<Hypothesis, DbError> {
        let record: Option<Hypothesis> = self.db.select((TABLE, id.to_string())).await?;

        record.ok_or_else(|| DbError::NotFound(format!("Hypothesis not found: {}", id)))
    }

    /// Replace a stored hypothesis.
    pub async fn update(&self, hypothesis: &Hypothesis) -> Result<Hypothesis, DbError> {
        let record: Option<Hypothesis> = self
            .db
            .update((TABLE, hypothesis.hypothesis_id.clone()))
            .content(hypothesis.clone())
            .await?;

        record.ok_or_else(|| {
            DbError::NotFound(format!("Hypothesis not found: {}", hypothesis.hypothesis_id))
        })
    }

    /// Highest scoring hypotheses first; ties broken by registration time.
    pub async fn top_by_score(&self, limit: usize) -> Result<Vec<Hypothesis>, DbError> {
        let mut result = self
            .db
            .query(
                r#"
                SELECT * FROM hypothesis
                ORDER BY score DESC, created_at ASC
                LIMIT $limit
                "#,
            )
            .bind(("limit", limit as i64))
            .await?;

        let records: Vec<Hypothesis> = result.take(0)?;
        Ok(records)
    }

    /// Hypotheses with the given status, oldest first.
    pub async fn with_status(&self, status: &str) -> Result<Vec<Hypothesis>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM hypothesis WHERE status = $status ORDER BY created_at ASC")
            .bind(("status", status.to_string()))
            .await?;

        let records: Vec<Hypothesis> = result.take(0)?;
        Ok(records)
    }
}
