//! SurrealDB integration for the route bridge.
//!
//! This crate provides database connectivity and repositories for
//! hypotheses, cross-universe provenance, the follow graph, the system
//! event log and archived job history.
//!
//! # Features
//!
//! - `memory` (default): Use in-memory storage for testing
//! - `rocksdb`: Use RocksDB for persistent file-based storage

mod connection;
mod schema;
pub mod repositories;

pub use connection::{Database, DbConfig, DbError, connect};
pub use schema::init_schema;

/// Connect and initialize the schema.
///
/// Each call returns an independent handle; `mem://` endpoints get a fresh
/// datastore.
pub async fn init(config: &DbConfig) -> Result<Database, DbError> {
    let db = connect(config).await?;
    init_schema(&db).await?;
    Ok(db)
}
