pub mod config;
pub mod error;
pub mod record;
pub mod wire;

pub use error::{ApiError, Tier};
pub use record::{dominates, nanos_to_ts, now_ts, ts_to_nanos, PutOutcome, Record};
pub use wire::{GetManyRequest, GetQuery, InternalGetResponse, InternalSetRequest, InternalSetResponse, SetRequest};
