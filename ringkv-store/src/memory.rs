use std::collections::HashMap;
use std::sync::Mutex;

use ringkv_base::{PutOutcome, Record};

use crate::{resolve_put, RecordStore, StoreResult};

/// In-memory `RecordStore`, used by tests that don't want a filesystem
/// dependency. Not durable across restarts.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryStore {
    async fn put_if_newer(
        &self,
        key: &str,
        value: &str,
        ts: f64,
        request_id: &str,
    ) -> StoreResult<PutOutcome> {
        let mut records = self.records.lock().unwrap();
        let outcome = resolve_put(records.get(key), ts, request_id);
        if outcome == PutOutcome::Applied {
            records.insert(key.to_string(), Record::new(value, ts, request_id));
        }
        Ok(outcome)
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Record>> {
        Ok(self.records.lock().unwrap().get(key).cloned())
    }

    async fn all_keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.records.lock().unwrap().keys().cloned().collect())
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<HashMap<String, Record>> {
        let records = self.records.lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|k| records.get(k).map(|r| (k.clone(), r.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        store.put_if_newer("k", "v1", 10.0, "r1").await.unwrap();
        let got = store.get("k").await.unwrap().unwrap();
        assert_eq!(got.value, "v1");
    }

    #[tokio::test]
    async fn older_write_is_ignored() {
        let store = MemoryStore::new();
        store.put_if_newer("k", "v1", 10.0, "r1").await.unwrap();
        let outcome = store.put_if_newer("k", "stale", 5.0, "r2").await.unwrap();
        assert_eq!(outcome, PutOutcome::Superseded);
        assert_eq!(store.get("k").await.unwrap().unwrap().value, "v1");
    }

    #[tokio::test]
    async fn idempotent_replay_of_same_request_id() {
        let store = MemoryStore::new();
        store.put_if_newer("k", "v1", 10.0, "r1").await.unwrap();
        let outcome = store.put_if_newer("k", "v1", 10.0, "r1").await.unwrap();
        assert_eq!(outcome, PutOutcome::Applied);
    }

    #[tokio::test]
    async fn all_keys_and_get_many() {
        let store = MemoryStore::new();
        store.put_if_newer("a", "1", 1.0, "r1").await.unwrap();
        store.put_if_newer("b", "2", 2.0, "r2").await.unwrap();
        let mut keys = store.all_keys().await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        let many = store
            .get_many(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(many.len(), 1);
        assert_eq!(many["a"].value, "1");
    }
}
