use crate::agent::{normalize_agent, AgentRecord};
use crate::api::auth_middleware::require_api_key;
use crate::api::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// GET /api/agents response
#[derive(Serialize)]
pub struct ListResponse {
    pub agents: Vec<AgentRecord>,
    pub count: usize,
}

/// DELETE /api/agents/:id response
#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// REST API for external agent integration.
///
/// POST   /api/agents      → create or update an agent
/// GET    /api/agents      → list all agents
/// GET    /api/agents/:id  → get a single agent
/// DELETE /api/agents/:id  → remove an agent
///
/// When an API key is configured, every request under `/api/agents`, unknown
/// sub-paths included, needs `Authorization: Bearer <key>`.
pub fn create_agents_router(state: Arc<AppState>) -> Router {
    // Fallback sits inside the layer so unmatched paths are gated too
    let routes = Router::new()
        .route("/", get(list_agents).post(upsert_agent))
        .route("/:id", get(get_agent).delete(delete_agent))
        .fallback(|| async { StatusCode::NOT_FOUND })
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state);

    Router::new().nest("/api/agents", routes)
}

async fn list_agents(State(state): State<Arc<AppState>>) -> Json<ListResponse> {
    let agents = state.registry.get_all();
    Json(ListResponse {
        count: agents.len(),
        agents,
    })
}

async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AgentRecord>, ApiError> {
    state.registry.get(&id).map(Json).ok_or(ApiError::NotFound)
}

/// POST /api/agents - normalize untrusted input, then upsert
async fn upsert_agent(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AgentRecord>, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("invalid JSON body: {}", e)))?;

    let agent = normalize_agent(&value, state.bounds)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    info!(
        agent_id = %agent.id,
        state = %agent.state,
        x = agent.x,
        y = agent.y,
        "Agent upserted via API"
    );

    state.registry.upsert(agent.clone());
    Ok(Json(agent))
}

async fn delete_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if !state.registry.remove(&id) {
        debug!(agent_id = %id, "Delete requested for unknown agent");
        return Err(ApiError::NotFound);
    }

    info!(agent_id = %id, "Agent removed via API");
    Ok(Json(DeleteResponse { deleted: id }))
}

/// Request-scoped errors for the agents API
#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Agent not found".to_string()),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}
