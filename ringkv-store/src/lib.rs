pub mod memory;
pub mod redb_store;

use std::collections::HashMap;

use ringkv_base::{PutOutcome, Record};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("record encoding error: {0}")]
    Encoding(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Single-node persistent map of `key -> Record`, with last-writer-wins
/// compare-and-swap on `ts`.
///
/// Implementations must serialize writes at the node granularity (a single
/// writer lock or equivalent) so that `put_if_newer`'s read-compare-write is
/// atomic with respect to concurrent callers.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_if_newer(
        &self,
        key: &str,
        value: &str,
        ts: f64,
        request_id: &str,
    ) -> StoreResult<PutOutcome>;

    async fn get(&self, key: &str) -> StoreResult<Option<Record>>;

    async fn all_keys(&self) -> StoreResult<Vec<String>>;

    async fn get_many(&self, keys: &[String]) -> StoreResult<HashMap<String, Record>>;
}

/// Decides the outcome of a candidate write against an existing record,
/// per the `put_if_newer` contract (idempotent replay, ts comparison with
/// request_id tie-break).
pub(crate) fn resolve_put(
    existing: Option<&Record>,
    candidate_ts: f64,
    candidate_req_id: &str,
) -> PutOutcome {
    let Some(existing) = existing else {
        return PutOutcome::Applied;
    };
    if existing.request_id == candidate_req_id {
        return PutOutcome::Applied;
    }
    let candidate_nanos = ringkv_base::ts_to_nanos(candidate_ts);
    let existing_nanos = existing.ts_nanos();
    if ringkv_base::dominates(candidate_nanos, candidate_req_id, existing_nanos, &existing.request_id) {
        PutOutcome::Applied
    } else {
        PutOutcome::Superseded
    }
}
