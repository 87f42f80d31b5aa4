//! Route handler functions for all API endpoints.

use axum::extract::State;
use axum::Json;
use parley_chat::Reply;
use parley_query::QueryExpression;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Chat
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: Reply,
}

/// POST /chat - one conversational turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let reply = state
        .dispatcher
        .handle(&req.session_id, &req.message, req.context.as_deref())
        .await?;
    Ok(Json(ChatResponse { reply }))
}

// =============================================================================
// Filter
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FilterRequest {
    pub context: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct FilterResponse {
    pub query: QueryExpression,
    pub rendered: String,
}

/// POST /filter - compile an utterance without a chat session.
pub async fn filter(
    State(state): State<AppState>,
    Json(req): Json<FilterRequest>,
) -> Result<Json<FilterResponse>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query cannot be empty".to_string()));
    }
    let (query, rendered) = state.dispatcher.compile(&req.context, &req.query)?;
    Ok(Json(FilterResponse { query, rendered }))
}

// =============================================================================
// Contexts / health
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ContextsResponse {
    pub contexts: Vec<String>,
}

/// GET /contexts - registered data context names.
pub async fn contexts(State(state): State<AppState>) -> Json<ContextsResponse> {
    Json(ContextsResponse {
        contexts: state.dispatcher.contexts(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub contracts: u64,
}

/// GET /health - liveness plus a storage round trip.
pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let contracts = state.contracts.count()?;
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        contracts,
    }))
}
