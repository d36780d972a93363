#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use orch_api::config::ServerConfig;
use orch_api::middleware::auth::AGENT_TOKEN_HEADER;
use orch_api::router::build_app_router;
use orch_api::state::AppState;
use orch_store::backend::MemoryStore;
use orch_store::{init_collections, Store, StorePool};

/// Admin token used by tests that close the admin gate.
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Build a test `ServerConfig` with safe defaults.
///
/// The admin gate is open; use [`test_config_with_admin`] to close it.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        admin_token: None,
        storage_dir: String::new(),
        heartbeat_timeout_secs: 120,
        heartbeat_check_interval_secs: 30,
        json_logs: false,
    }
}

/// Like [`test_config`] but requiring [`ADMIN_TOKEN`] on admin endpoints.
pub fn test_config_with_admin() -> ServerConfig {
    ServerConfig {
        admin_token: Some(ADMIN_TOKEN.to_string()),
        ..test_config()
    }
}

/// A fresh in-memory store with empty collections.
pub async fn test_store() -> StorePool {
    let store = Store::new(Arc::new(MemoryStore::new()));
    init_collections(&store)
        .await
        .expect("collections should initialize");
    store
}

/// Build the full application router over `store` with the given config.
pub fn build_app_with(store: StorePool, config: ServerConfig) -> Router {
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
    };
    build_app_router(state, &config)
}

/// Build the full application router over `store` with an open admin gate.
pub fn build_test_app(store: StorePool) -> Router {
    build_app_with(store, test_config())
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(app: Router, request: Request<Body>) -> Response<Body> {
    app.oneshot(request).await.expect("request should not fail")
}

fn json_request(
    method: Method,
    uri: &str,
    body: &serde_json::Value,
    headers: &[(&str, &str)],
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

fn empty_request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::empty()).expect("request should build")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, empty_request(Method::GET, uri, &[])).await
}

pub async fn get_admin(app: Router, uri: &str) -> Response<Body> {
    let bearer = format!("Bearer {ADMIN_TOKEN}");
    send(
        app,
        empty_request(Method::GET, uri, &[(AUTHORIZATION.as_str(), bearer.as_str())]),
    )
    .await
}

pub async fn get_agent(app: Router, uri: &str, agent_token: &str) -> Response<Body> {
    send(
        app,
        empty_request(Method::GET, uri, &[(AGENT_TOKEN_HEADER, agent_token)]),
    )
    .await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, empty_request(Method::POST, uri, &[])).await
}

pub async fn post_empty_agent(app: Router, uri: &str, agent_token: &str) -> Response<Body> {
    send(
        app,
        empty_request(Method::POST, uri, &[(AGENT_TOKEN_HEADER, agent_token)]),
    )
    .await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, json_request(Method::POST, uri, &body, &[])).await
}

pub async fn post_json_admin(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let bearer = format!("Bearer {ADMIN_TOKEN}");
    send(
        app,
        json_request(
            Method::POST,
            uri,
            &body,
            &[(AUTHORIZATION.as_str(), bearer.as_str())],
        ),
    )
    .await
}

pub async fn post_json_agent(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    agent_token: &str,
) -> Response<Body> {
    send(
        app,
        json_request(Method::POST, uri, &body, &[(AGENT_TOKEN_HEADER, agent_token)]),
    )
    .await
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Register an agent through the API, returning `(agent_id, agent_token)`.
pub async fn register_agent(app: Router, hostname: &str) -> (String, String) {
    let response = post_json(app, "/agents", serde_json::json!({ "hostname": hostname })).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let json = body_json(response).await;
    let id = json["data"]["agent"]["id"]
        .as_str()
        .expect("agent id")
        .to_string();
    let token = json["data"]["agent_token"]
        .as_str()
        .expect("agent token")
        .to_string();
    (id, token)
}

/// Submit a command job through the API (open admin gate), returning its id.
pub async fn submit_command_job(app: Router, args: &[&str]) -> String {
    let body = serde_json::json!({ "payload": { "kind": "command", "args": args } });
    let response = post_json(app, "/jobs", body).await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let json = body_json(response).await;
    json["data"]["id"].as_str().expect("job id").to_string()
}
