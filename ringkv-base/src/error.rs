use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Which tier rejected a request; only meaningful for [`ApiError::Overloaded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Gateway,
    Node,
}

/// The error taxonomy shared by the gateway and node HTTP surfaces.
///
/// Every handler returns `Result<impl IntoResponse, ApiError>`; this impl
/// renders each variant to the exact JSON shape the external interface
/// contract specifies for that condition.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0:?} overloaded")]
    Overloaded(Tier),

    #[error("cluster is not stable")]
    Unstable,

    #[error("not found")]
    NotFound,

    #[error("write failed: {successes} successes")]
    WriteFailed {
        successes: usize,
        errors: Vec<String>,
    },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Unstable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::WriteFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Overloaded(Tier::Gateway) => json!({"error": "gateway overloaded"}),
            ApiError::Overloaded(Tier::Node) => json!({"error": "node overloaded"}),
            ApiError::Unstable => json!({"error": "Cluster is not stable, try again soon."}),
            ApiError::NotFound => json!({"result": "not_found"}),
            ApiError::WriteFailed { successes, errors } => json!({
                "result": "write_failed",
                "successes": successes,
                "errors": errors,
            }),
            ApiError::Storage(msg) => json!({"error": msg}),
            ApiError::BadRequest(msg) => json!({"error": msg}),
            ApiError::Internal(msg) => json!({"error": msg}),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if !matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::debug!(category = "http", status = %status, error = %self, "request rejected");
        } else {
            tracing::error!(category = "http", status = %status, error = %self, "request failed");
        }
        (status, Json(self.body())).into_response()
    }
}
