use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Body of a public `POST /set`, accepted by both the gateway and a node's
/// self-coordinating path. `ts` and `request_id` are optional on the wire;
/// the coordinator fills in whichever is missing.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    pub request_id: Option<String>,
    pub ts: Option<f64>,
}

/// Query parameters for a public `GET /get`.
#[derive(Debug, Clone, Deserialize)]
pub struct GetQuery {
    pub key: String,
}

/// Body of the internal replica `POST /internal/set` call. Unlike
/// [`SetRequest`], `ts` and `request_id` are always present: the
/// coordinator has already resolved them before fanning out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalSetRequest {
    pub key: String,
    pub value: String,
    pub ts: f64,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalSetResponse {
    pub result: String,
}

impl InternalSetResponse {
    pub fn replicated() -> Self {
        Self { result: "replicated".to_string() }
    }

    pub fn old_write_ignored() -> Self {
        Self { result: "old_write_ignored".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalGetResponse {
    pub key: String,
    pub value: Option<Record>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetManyRequest {
    pub keys: Vec<String>,
}
