//! Redb-backed durable key-value store.
//!
//! Uses Redb's ACID transactions with copy-on-write for crash safety, so a
//! credential write either lands completely or not at all - a half-written
//! credential would lock every companion out.

use std::{path::Path, sync::Arc};

use redb::{Database, TableDefinition};

use super::{KvError, KvStore};

/// Table: kv
/// Key: UTF-8 key string
/// Value: raw value bytes (JSON for structured records)
const KV: TableDefinition<&str, &[u8]> = TableDefinition::new("kv");

/// Durable store backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbKv {
    db: Arc<Database>,
}

impl RedbKv {
    /// Open or create a Redb database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let db = Database::create(path.as_ref()).map_err(|e| KvError::Io(e.to_string()))?;

        // Create the table up front so reads on a fresh database succeed.
        let txn = db.begin_write().map_err(|e| KvError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(KV).map_err(|e| KvError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| KvError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl KvStore for RedbKv {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let txn = self.db.begin_read().map_err(|e| KvError::Io(e.to_string()))?;
        let table = txn.open_table(KV).map_err(|e| KvError::Io(e.to_string()))?;
        let value = table.get(key).map_err(|e| KvError::Io(e.to_string()))?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let txn = self.db.begin_write().map_err(|e| KvError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(KV).map_err(|e| KvError::Io(e.to_string()))?;
            table.insert(key, value).map_err(|e| KvError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| KvError::Io(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), KvError> {
        let txn = self.db.begin_write().map_err(|e| KvError::Io(e.to_string()))?;
        {
            let mut table = txn.open_table(KV).map_err(|e| KvError::Io(e.to_string()))?;
            table.remove(key).map_err(|e| KvError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| KvError::Io(e.to_string()))
    }
}
