use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use ringkv_base::{ApiError, Tier};
use ringkv_membership::{MembershipSnapshot, NodeState};
use serde_json::json;

use crate::state::AppState;

pub async fn nodes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.membership.snapshot())
}

pub async fn gossip(
    State(state): State<Arc<AppState>>,
    Json(incoming): Json<MembershipSnapshot>,
) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Node))?;
    let merged = state.membership.merge_gossip(&incoming);
    Ok(Json(merged))
}

pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.membership.snapshot();
    let self_addr = state.membership.self_addr();
    let ready = matches!(snapshot.states.get(&self_addr), Some(NodeState::Ready));
    Json(json!({
        "state": if ready { "ready" } else { "joining" },
        "self_addr": self_addr,
        "in_flight": state.admission.in_flight(),
        "max_in_flight": state.admission.cap(),
        "known_nodes": snapshot.nodes.len(),
        "dead_nodes": snapshot.dead_nodes.len(),
    }))
}
