use serde::{Deserialize, Serialize};

/// A single stored value together with its write metadata.
///
/// `ts` is carried on the wire as `f64` seconds-since-epoch for
/// cross-language compatibility (per the external interface contract).
/// Internally, comparisons use [`ts_to_nanos`] so that two writes with the
/// same wall-clock second compare deterministically without floating point
/// drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub value: String,
    pub ts: f64,
    pub request_id: String,
}

impl Record {
    pub fn new(value: impl Into<String>, ts: f64, request_id: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ts,
            request_id: request_id.into(),
        }
    }

    pub fn ts_nanos(&self) -> u64 {
        ts_to_nanos(self.ts)
    }
}

/// Result of a `RecordStore::put_if_newer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutOutcome {
    Applied,
    Superseded,
}

/// Converts a wall-clock `f64` timestamp (seconds since epoch) into whole
/// nanoseconds for deterministic comparison and on-disk storage.
pub fn ts_to_nanos(ts: f64) -> u64 {
    (ts * 1_000_000_000.0).round() as u64
}

pub fn nanos_to_ts(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000_000.0
}

/// Current wall-clock time as the `f64` seconds-since-epoch used for `ts`.
pub fn now_ts() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Total order over `(ts, request_id)` used by `put_if_newer`'s tie-break:
/// the greater `ts` wins; on equal `ts`, the lexicographically greater
/// `request_id` wins. Applied identically on every replica so that repeated
/// application of the same pair of writes converges regardless of arrival
/// order.
pub fn dominates(candidate_ts_nanos: u64, candidate_req_id: &str, incumbent_ts_nanos: u64, incumbent_req_id: &str) -> bool {
    (candidate_ts_nanos, candidate_req_id) >= (incumbent_ts_nanos, incumbent_req_id)
}
