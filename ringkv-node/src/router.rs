use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/internal/set", post(handlers::internal::internal_set))
        .route("/internal/get", get(handlers::internal::internal_get))
        .route("/internal/get_many", post(handlers::internal::internal_get_many))
        .route("/internal/all_keys", get(handlers::internal::internal_all_keys))
        .route("/nodes", get(handlers::membership::nodes))
        .route("/gossip", post(handlers::membership::gossip))
        .route("/status", get(handlers::membership::status))
        .route("/set", post(handlers::public::set))
        .route("/get", get(handlers::public::get))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;

    tracing::debug!(
        category = "http",
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "request handled"
    );

    response
}
