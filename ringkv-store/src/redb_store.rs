use std::collections::HashMap;
use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};
use ringkv_base::{nanos_to_ts, PutOutcome, Record};
use tokio::sync::Mutex;

use crate::{resolve_put, RecordStore, StoreError, StoreResult};

const RECORDS: TableDefinition<&str, (&str, u64, &str)> = TableDefinition::new("records");

/// Durable `RecordStore` backed by a single `redb` database file.
///
/// Writes are serialized through `db` so that the read-compare-write in
/// `put_if_newer` is atomic with respect to concurrent callers on this node;
/// `redb` itself only allows one write transaction at a time, but the mutex
/// also protects the compare step from racing with another async task.
pub struct RedbStore {
    db: Mutex<Database>,
}

impl RedbStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = Database::create(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        {
            let txn = db.begin_write().map_err(|e| StoreError::Backend(e.to_string()))?;
            txn.open_table(RECORDS).map_err(|e| StoreError::Backend(e.to_string()))?;
            txn.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        Ok(Self { db: Mutex::new(db) })
    }

    fn row_to_record(value: &str, ts_nanos: u64, request_id: &str) -> Record {
        Record::new(value, nanos_to_ts(ts_nanos), request_id)
    }
}

#[async_trait::async_trait]
impl RecordStore for RedbStore {
    async fn put_if_newer(
        &self,
        key: &str,
        value: &str,
        ts: f64,
        request_id: &str,
    ) -> StoreResult<PutOutcome> {
        let db = self.db.lock().await;
        let txn = db.begin_write().map_err(|e| StoreError::Backend(e.to_string()))?;
        let outcome = {
            let mut table = txn.open_table(RECORDS).map_err(|e| StoreError::Backend(e.to_string()))?;
            let existing = table
                .get(key)
                .map_err(|e| StoreError::Backend(e.to_string()))?
                .map(|row| {
                    let (v, ts_nanos, req_id) = row.value();
                    Record::new(v, nanos_to_ts(ts_nanos), req_id)
                });
            let outcome = resolve_put(existing.as_ref(), ts, request_id);
            if outcome == PutOutcome::Applied {
                table
                    .insert(key, (value, ringkv_base::ts_to_nanos(ts), request_id))
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
            outcome
        };
        txn.commit().map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(outcome)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Record>> {
        let db = self.db.lock().await;
        let txn = db.begin_read().map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = txn.open_table(RECORDS).map_err(|e| StoreError::Backend(e.to_string()))?;
        let row = table.get(key).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(row.map(|r| {
            let (v, ts_nanos, req_id) = r.value();
            Self::row_to_record(v, ts_nanos, req_id)
        }))
    }

    async fn all_keys(&self) -> StoreResult<Vec<String>> {
        let db = self.db.lock().await;
        let txn = db.begin_read().map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = txn.open_table(RECORDS).map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut keys = Vec::new();
        for row in table.iter().map_err(|e| StoreError::Backend(e.to_string()))? {
            let (k, _) = row.map_err(|e| StoreError::Backend(e.to_string()))?;
            keys.push(k.value().to_string());
        }
        Ok(keys)
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<HashMap<String, Record>> {
        let db = self.db.lock().await;
        let txn = db.begin_read().map_err(|e| StoreError::Backend(e.to_string()))?;
        let table = txn.open_table(RECORDS).map_err(|e| StoreError::Backend(e.to_string()))?;
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(row) = table.get(key.as_str()).map_err(|e| StoreError::Backend(e.to_string()))? {
                let (v, ts_nanos, req_id) = row.value();
                out.insert(key.clone(), Self::row_to_record(v, ts_nanos, req_id));
            }
        }
        Ok(out)
    }
}
