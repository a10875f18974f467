//! Cross-universe provenance repository.

use std::sync::Arc;

use bridge_core::BridgeRecord;
use tokio::sync::Mutex;

use crate::{Database, DbError};

const TABLE: &str = "bridge_record";

/// Repository for provenance records, keyed by coin id.
#[derive(Clone)]
pub struct BridgeRepository {
    db: Database,
    /// Shared by clones; held across check-and-insert in [`register`](Self::register).
    write_lock: Arc<Mutex<()>>,
}

impl BridgeRepository {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store a record unless the coin already has provenance.
    ///
    /// Returns `false` for a duplicate. Concurrent calls for one coin see
    /// exactly one `true`.
    pub async fn register(&self, record: &BridgeRecord) -> Result<bool, DbError> {
        let _guard = self.write_lock.lock().await;

        if self.exists(&record.coin_id).await? {
            return Ok(false);
        }

        self.insert(record).await?;
        Ok(true)
    }

    /// Store a record. Fails if the coin already has provenance.
    pub async fn insert(&self, record: &BridgeRecord) -> Result<BridgeRecord, DbError> {
        let created: Option<BridgeRecord> = self
            .db
            .create((TABLE, record.coin_id.clone()))
            .content(record.clone())
            .await?;

        created.ok_or_else(|| DbError::Query("Failed to create bridge record".into()))
    }

    pub async fn get(&self, coin_id: &str) -> Result<Option<BridgeRecord>, DbError> {
        let record: Option<BridgeRecord> = self.db.select((TABLE, coin_id.to_string())).await?;
        Ok(record)
    }

    pub async fn exists(&self, coin_id: &str) -> Result<bool, DbError> {
        Ok(self.get(coin_id).await?.is_some())
    }

    /// All provenance entries for a coin (at most one).
    pub async fn for_coin(&self, coin_id: &str) -> Result<Vec<BridgeRecord>, DbError> {
        Ok(self.get(coin_id).await?.into_iter().collect())
    }

    /// Records whose source is the given universe.
    pub async fn from_universe(&self, universe: &str) -> Result<Vec<BridgeRecord>, DbError> {
        let mut result = self
            .db
            .query("SELECT * FROM bridge_record WHERE source_universe = $universe")
            .bind(("universe", universe.to_string()))
            .await?;

        let records: Vec<BridgeRecord> = result.take(0)?;
        Ok(records)
    }
}
