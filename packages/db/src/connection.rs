//! Database connection management.

use serde::{Deserialize, Serialize};
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect as connect_any};
use surrealdb::opt::auth::Root;
use thiserror::Error;

/// Database connection handle. Cheap to clone.
pub type Database = Surreal<Any>;

/// Database configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Connection endpoint: "mem://", "file://path" or "rocksdb://path"
    pub endpoint: String,
    /// Namespace to use
    pub namespace: String,
    /// Database name to use
    pub database: String,
    /// Optional root credentials for authentication
    #[serde(default, skip_serializing)]
    pub credentials: Option<(String, String)>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            endpoint: "mem://".to_string(),
            namespace: "bridge".to_string(),
            database: "main".to_string(),
            credentials: None,
        }
    }
}

impl DbConfig {
    /// Create a config for in-memory testing.
    pub fn memory() -> Self {
        Self::default()
    }

    /// Create a config for file-based persistence.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            endpoint: format!("file://{}", path.into()),
            ..Default::default()
        }
    }

    /// Create a config for RocksDB persistence (requires rocksdb feature).
    pub fn rocksdb(path: impl Into<String>) -> Self {
        Self {
            endpoint: format!("rocksdb://{}", path.into()),
            ..Default::default()
        }
    }

    /// Set the endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the namespace.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the database name.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set root credentials for authentication.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connection(#[from] surrealdb::Error),
    #[error("Query error: {0}")]
    Query(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Open a connection and select the configured namespace and database.
pub async fn connect(config: &DbConfig) -> Result<Database, DbError> {
    tracing::info!("Connecting to database: {}", config.endpoint);

    let db = connect_any(config.endpoint.as_str()).await?;

    // Authenticate if credentials provided
    if let Some((username, password)) = &config.credentials {
        db.signin(Root { username, password }).await?;
    }

    db.use_ns(&config.namespace).use_db(&config.database).await?;

    tracing::info!(
        "Connected to database: {}/{}",
        config.namespace,
        config.database
    );

    Ok(db)
}
