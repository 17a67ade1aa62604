use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use ringkv_base::{now_ts, ApiError, GetQuery, SetRequest, Tier};
use ringkv_ring::Ring;
use serde_json::json;
use uuid::Uuid;

use crate::coordinator::{coordinate_get, coordinate_set, quorum};
use crate::state::AppState;

fn stable_ring(state: &AppState) -> Result<Ring, ApiError> {
    if !state.membership.is_stable(state.config.ring_stable_period) {
        return Err(ApiError::Unstable);
    }
    Ok(Ring::build(&state.membership.snapshot(), state.config.cluster.num_vnodes))
}

pub async fn set(State(state): State<Arc<AppState>>, Json(req): Json<SetRequest>) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Gateway))?;
    if req.key.is_empty() {
        return Err(ApiError::BadRequest("key must not be empty".to_string()));
    }

    let ring = stable_ring(&state)?;
    let owners = ring.owners(&req.key, state.config.cluster.replication_factor);
    if owners.is_empty() {
        return Err(ApiError::Unstable);
    }
    let w = quorum(owners.len());

    let ts = req.ts.unwrap_or_else(now_ts);
    let request_id = req.request_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    let (successes, errors) = coordinate_set(&state, owners, &req.key, &req.value, ts, &request_id).await;
    if successes >= w {
        Ok(Json(json!({"result": "ok", "successes": successes})))
    } else {
        Err(ApiError::WriteFailed { successes, errors })
    }
}

pub async fn get(State(state): State<Arc<AppState>>, Query(q): Query<GetQuery>) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Gateway))?;

    let ring = stable_ring(&state)?;
    let owners = ring.owners(&q.key, state.config.cluster.replication_factor);
    if owners.is_empty() {
        return Err(ApiError::Unstable);
    }
    let r = quorum(owners.len());

    match coordinate_get(&state, owners, &q.key, r).await {
        Some(record) => Ok(Json(json!({"key": q.key, "value": record.value, "ts": record.ts}))),
        None => Err(ApiError::NotFound),
    }
}

pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.membership.snapshot();
    Json(json!({
        "in_flight": state.admission.in_flight(),
        "in_flight_limit": state.admission.cap(),
        "known_nodes": snapshot.nodes.len(),
        "ready_nodes": snapshot.ready_nodes().count(),
        "dead_nodes": snapshot.dead_nodes.len(),
        "ring_age_ms": state.membership.refresh_age().as_millis(),
        "stable": state.membership.is_stable(state.config.ring_stable_period),
    }))
}

pub async fn ring(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let ring = stable_ring(&state)?;
    Ok(Json(json!({
        "ring": ring.hex_hashes(),
        "node_refs": ring.node_refs(),
        "num_vnodes": state.config.cluster.num_vnodes,
        "replication_factor": state.config.cluster.replication_factor,
    })))
}
