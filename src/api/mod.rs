// HTTP and WebSocket APIs

mod agents;
pub mod auth_middleware;
pub mod websocket;

pub use agents::{create_agents_router, ApiError, DeleteResponse, ListResponse};
pub use websocket::{create_ws_router, ws_handler};

use crate::agent::WorldBounds;
use crate::state::{AgentRegistry, Broadcaster};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state for every router
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<AgentRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub bounds: WorldBounds,
    /// None = open API (dev mode)
    pub api_key: Option<String>,
    /// Whether the internal mock generator is producing agents
    pub mock_enabled: bool,
    /// Live viewer sessions
    pub connections: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(broadcaster: Arc<Broadcaster>, bounds: WorldBounds, api_key: Option<String>) -> Self {
        Self {
            registry: Arc::clone(broadcaster.registry()),
            broadcaster,
            bounds,
            mock_enabled: api_key.is_none(),
            api_key,
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Assemble the full application: agents API, viewer stream, health, CORS.
pub fn create_app(state: AppState, cors_origin: &str, max_body_bytes: usize) -> Router {
    let state = Arc::new(state);

    Router::new()
        .merge(create_agents_router(Arc::clone(&state)))
        .merge(create_ws_router(Arc::clone(&state)))
        .merge(create_health_router(state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors_layer(cors_origin))
}

pub fn create_health_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "agents": state.registry.count(),
        "connections": state.connections.load(Ordering::SeqCst),
        "mode": if state.mock_enabled { "mock" } else { "api" },
    }))
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!(origin = %origin, "Invalid CORS origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}
