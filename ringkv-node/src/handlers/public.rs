use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use ringkv_base::{now_ts, ApiError, GetQuery, SetRequest, Tier};
use ringkv_ring::Ring;
use serde_json::json;
use uuid::Uuid;

use crate::coordinator::{coordinate_get, coordinate_set, owners_for, quorum};
use crate::state::AppState;

/// The node's self-coordinating public `POST /set`, used when a node is
/// addressed directly rather than through the gateway (§4.5).
pub async fn set(State(state): State<Arc<AppState>>, Json(req): Json<SetRequest>) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Node))?;
    if req.key.is_empty() {
        return Err(ApiError::BadRequest("key must not be empty".to_string()));
    }
    let ts = req.ts.unwrap_or_else(now_ts);
    let request_id = req.request_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let ring = Ring::build(&state.membership.snapshot(), state.config.cluster.num_vnodes);
    let owners = owners_for(&ring, &req.key, state.config.cluster.replication_factor);
    if owners.is_empty() {
        return Err(ApiError::Unstable);
    }
    let w = quorum(owners.len());

    let (successes, errors) = coordinate_set(&state, owners, &req.key, &req.value, ts, &request_id).await;
    if successes >= w {
        Ok(Json(json!({"result": "ok", "successes": successes})))
    } else {
        Err(ApiError::WriteFailed { successes, errors })
    }
}

pub async fn get(State(state): State<Arc<AppState>>, Query(q): Query<GetQuery>) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Node))?;

    let ring = Ring::build(&state.membership.snapshot(), state.config.cluster.num_vnodes);
    let owners = owners_for(&ring, &q.key, state.config.cluster.replication_factor);
    if owners.is_empty() {
        return Err(ApiError::Unstable);
    }
    let r = quorum(owners.len());

    match coordinate_get(&state, owners, &q.key, r).await {
        Some(record) => Ok(Json(json!({"key": q.key, "value": record.value, "ts": record.ts}))),
        None => Err(ApiError::NotFound),
    }
}
