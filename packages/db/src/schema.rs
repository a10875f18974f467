//! Database schema definitions using SurrealQL.

use crate::{Database, DbError};

/// Initialize the database schema.
///
/// This creates all necessary tables and indexes.
pub async fn init_schema(db: &Database) -> Result<(), DbError> {
    tracing::info!("Initializing database schema...");

    db.query(HYPOTHESIS_SCHEMA).await?;
    db.query(BRIDGE_SCHEMA).await?;
    db.query(FOLLOW_SCHEMA).await?;
    db.query(JOB_HISTORY_SCHEMA).await?;
    db.query(EVENT_LOG_SCHEMA).await?;

    tracing::info!("Database schema initialized");

    Ok(())
}

/// Hypothesis table schema. Record id is the hypothesis id.
const HYPOTHESIS_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS hypothesis SCHEMALESS;

DEFINE INDEX IF NOT EXISTS hypothesis_score ON hypothesis FIELDS score;
DEFINE INDEX IF NOT EXISTS hypothesis_status ON hypothesis FIELDS status;
"#;

/// Cross-universe provenance. Record id is the coin id, one record per coin.
const BRIDGE_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS bridge_record SCHEMALESS;

DEFINE INDEX IF NOT EXISTS bridge_source ON bridge_record FIELDS source_universe, source_coin;
"#;

/// Follow edges. Record id is `<follower>:<followee>`.
const FOLLOW_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS follow SCHEMALESS;

DEFINE INDEX IF NOT EXISTS follow_followee ON follow FIELDS followee;
DEFINE INDEX IF NOT EXISTS follow_follower ON follow FIELDS follower;
"#;

/// Archived terminal jobs.
const JOB_HISTORY_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS job_history SCHEMALESS;

DEFINE INDEX IF NOT EXISTS history_operation ON job_history FIELDS operation;
DEFINE INDEX IF NOT EXISTS history_status ON job_history FIELDS final_status;
"#;

/// Logged system events, keyed by generated ids.
const EVENT_LOG_SCHEMA: &str = r#"
DEFINE TABLE IF NOT EXISTS event_log SCHEMALESS;

DEFINE INDEX IF NOT EXISTS event_log_category ON event_log FIELDS category;
"#;
