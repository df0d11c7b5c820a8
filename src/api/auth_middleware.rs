use crate::api::AppState;
use crate::auth::verify_api_key;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Global API key check for the agents API.
///
/// Runs before routing reaches any handler, for every method. With no key
/// configured (dev mode) requests pass straight through.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if let Err(e) = verify_api_key(req.headers(), state.api_key.as_deref()) {
        warn!(
            method = %req.method(),
            path = %req.uri().path(),
            reason = %e,
            "Rejected unauthenticated API request"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid or missing API key" })),
        )
            .into_response();
    }
    next.run(req).await
}
