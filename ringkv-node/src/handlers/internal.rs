use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use ringkv_base::{ApiError, GetManyRequest, GetQuery, InternalGetResponse, InternalSetRequest, InternalSetResponse, PutOutcome, Tier};

use crate::state::AppState;

pub async fn internal_set(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InternalSetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Node))?;

    let outcome = state
        .store
        .put_if_newer(&req.key, &req.value, req.ts, &req.request_id)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    Ok(Json(match outcome {
        PutOutcome::Applied => InternalSetResponse::replicated(),
        PutOutcome::Superseded => InternalSetResponse::old_write_ignored(),
    }))
}

pub async fn internal_get(
    State(state): State<Arc<AppState>>,
    Query(q): Query<GetQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Node))?;

    let value = state.store.get(&q.key).await.map_err(|e| ApiError::Storage(e.to_string()))?;
    Ok(Json(InternalGetResponse { key: q.key, value }))
}

pub async fn internal_get_many(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetManyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Node))?;

    let found = state.store.get_many(&req.keys).await.map_err(|e| ApiError::Storage(e.to_string()))?;
    Ok(Json(found))
}

pub async fn internal_all_keys(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let _permit = state.admission.try_acquire().ok_or(ApiError::Overloaded(Tier::Node))?;

    let keys = state.store.all_keys().await.map_err(|e| ApiError::Storage(e.to_string()))?;
    Ok(Json(keys))
}
