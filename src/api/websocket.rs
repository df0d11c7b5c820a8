use crate::api::AppState;
use crate::subscription::ConnectionSession;
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::debug;

/// GET /ws - viewer WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    debug!("WebSocket upgrade request received");
    ws.on_upgrade(move |socket| async move {
        state.connections.fetch_add(1, Ordering::SeqCst);
        ConnectionSession::new()
            .handle(socket, Arc::clone(&state.broadcaster))
            .await;
        state.connections.fetch_sub(1, Ordering::SeqCst);
    })
}

/// Viewer stream router. Read-only, so no API key is required.
pub fn create_ws_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}
