//! Integration tests for the Parley API, driving the router directly with
//! `tower::ServiceExt::oneshot`. Each test gets its own in-memory state.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use parley_api::create_router;
use parley_api::handlers::{ContextsResponse, HealthResponse};
use parley_api::state::AppState;
use parley_core::ParleyConfig;
use parley_flow::MockDealClient;
use parley_storage::Database;

// =============================================================================
// Helpers
// =============================================================================

fn make_state() -> AppState {
    AppState::new(
        ParleyConfig::default(),
        Database::in_memory().unwrap(),
        Arc::new(MockDealClient::new()),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn chat(state: &AppState, session: &str, message: &str) -> Value {
    let resp = create_router(state.clone())
        .oneshot(post_json(
            "/chat",
            json!({"session_id": session, "message": message}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["reply"].clone()
}

// =============================================================================
// GET /health, GET /contexts
// =============================================================================

#[tokio::test]
async fn test_health() {
    let resp = create_router(make_state())
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.contracts, 0);
}

#[tokio::test]
async fn test_contexts() {
    let resp = create_router(make_state())
        .oneshot(get("/contexts"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: ContextsResponse = serde_json::from_value(body_json(resp).await).unwrap();
    assert_eq!(body.contexts, vec!["USERS", "CONTRACTS"]);
}

// =============================================================================
// POST /chat
// =============================================================================

#[tokio::test]
async fn test_chat_contract_flow_over_http() {
    let state = make_state();

    assert_eq!(
        chat(&state, "web-1", "start contract").await,
        json!("Please provide your email address")
    );
    chat(&state, "web-1", "ada@example.com").await;
    chat(&state, "web-1", "Ada Lovelace").await;
    chat(&state, "web-1", "5551234567").await;
    let reply = chat(&state, "web-1", "1 Main St").await;

    assert_eq!(
        reply,
        json!({"message": "Contract started successfully", "deal_id": "mock-deal-1"})
    );
    assert_eq!(state.contracts.count().unwrap(), 1);
}

#[tokio::test]
async fn test_chat_query_with_context() {
    let resp = create_router(make_state())
        .oneshot(post_json(
            "/chat",
            json!({"session_id": "web-2", "message": "count", "context": "contracts"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let reply = body_json(resp).await["reply"].clone();
    assert_eq!(reply["query"]["operation"], "select_count");
    assert_eq!(reply["query"]["table"], "contracts");
    assert_eq!(
        reply["rendered"],
        r#"supabase.table("contracts").select("*", count="exact")"#
    );
}

#[tokio::test]
async fn test_chat_query_without_context() {
    let reply = chat(&make_state(), "web-3", "show max age").await;
    assert_eq!(reply["message"], "Please specify data context");
    assert_eq!(reply["available_contexts"], json!(["USERS", "CONTRACTS"]));
}

#[tokio::test]
async fn test_chat_empty_message_is_bad_request() {
    let resp = create_router(make_state())
        .oneshot(post_json(
            "/chat",
            json!({"session_id": "web-4", "message": "  "}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "bad_request");
    assert_eq!(body["message"], "message cannot be empty");
}

#[tokio::test]
async fn test_chat_missing_field_is_rejected() {
    let resp = create_router(make_state())
        .oneshot(post_json("/chat", json!({"message": "hi"})))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

// =============================================================================
// POST /filter
// =============================================================================

#[tokio::test]
async fn test_filter_update() {
    let resp = create_router(make_state())
        .oneshot(post_json(
            "/filter",
            json!({"context": "USERS", "query": "update set status = active where id = 5"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["query"]["operation"], "update");
    assert_eq!(body["query"]["assignments"][0]["column"], "status");
    assert_eq!(body["query"]["assignments"][0]["value"], "active");
    assert_eq!(body["query"]["conditions"][0]["value"], 5);
    assert_eq!(
        body["rendered"],
        r#"supabase.table("users").update({"status": "active"}).eq("id", 5)"#
    );
}

#[tokio::test]
async fn test_filter_unknown_context_is_bad_request() {
    let resp = create_router(make_state())
        .oneshot(post_json(
            "/filter",
            json!({"context": "ORDERS", "query": "count"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["message"], "Unknown context: ORDERS");
}

#[tokio::test]
async fn test_filter_comparison_without_column_names_context() {
    let resp = create_router(make_state())
        .oneshot(post_json(
            "/filter",
            json!({"context": "users", "query": "something > 4"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "No column of USERS mentioned in the request"
    );
}

#[tokio::test]
async fn test_filter_incomplete_update_is_bad_request() {
    let resp = create_router(make_state())
        .oneshot(post_json(
            "/filter",
            json!({"context": "USERS", "query": "update and show max age"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let resp = create_router(make_state())
        .oneshot(get("/nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
