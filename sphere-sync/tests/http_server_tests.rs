//! HTTP routing tests
//!
//! Drive the router with `oneshot`; sync routes talk to a mock upstream.

mod helpers;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sphere_common::events::EventBus;
use sphere_sync::store::MemoryPayloadStore;
use sphere_sync::{build_router, AppState};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use helpers::mock_api::{tracks, MockApi, MockData, TEST_TOKEN};
use helpers::test_settings;

fn test_app_state(base_url: &str) -> AppState {
    AppState::new(
        test_settings(base_url),
        Arc::new(MemoryPayloadStore::new()),
        EventBus::new(100),
    )
    .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, session: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-session-id", session)
        .body(Body::empty())
        .unwrap()
}

fn post_sync(body: Value, session: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/sync")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-session-id", session);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_reports_module() {
    let app = build_router(test_app_state("http://127.0.0.1:9"));

    let (status, body) = send(app, get("/health", "default")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "sphere-sync");
    assert_eq!(body["active_syncs"], 0);
}

#[tokio::test]
async fn test_status_idle_for_new_session() {
    let app = build_router(test_app_state("http://127.0.0.1:9"));

    let (status, body) = send(app, get("/api/sync/status", "fresh")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "idle");
    assert_eq!(body["percent"], 0);
}

#[tokio::test]
async fn test_sphere_not_found_before_sync() {
    let app = build_router(test_app_state("http://127.0.0.1:9"));

    let (status, body) = send(app, get("/api/sphere", "fresh")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_sync_without_token_is_unauthorized() {
    let app = build_router(test_app_state("http://127.0.0.1:9"));

    let (status, body) = send(app, post_sync(json!({"mode": "quick"}), "s1", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "NOT_AUTHENTICATED");
}

#[tokio::test]
async fn test_sync_rejects_unknown_mode() {
    let app = build_router(test_app_state("http://127.0.0.1:9"));

    let response = app
        .oneshot(post_sync(json!({"mode": "medium"}), "s1", Some(TEST_TOKEN)))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_sync_then_fetch_sphere() {
    let mock = MockApi::start(MockData {
        liked: tracks("t", 3),
        ..MockData::default()
    })
    .await;
    let state = test_app_state(&mock.base_url);

    let (status, body) = send(
        build_router(state.clone()),
        post_sync(json!({"mode": "quick", "limit": 3}), "s1", Some(TEST_TOKEN)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["trackCount"], 3);
    assert_eq!(body["tracks"].as_array().unwrap().len(), 3);

    let (status, stored) = send(build_router(state.clone()), get("/api/sphere", "s1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["trackCount"], 3);

    let (_, progress) = send(build_router(state.clone()), get("/api/sync/status", "s1")).await;
    assert_eq!(progress["status"], "done");
    assert_eq!(progress["percent"], 100);

    // Other sessions are unaffected
    let (status, _) = send(build_router(state.clone()), get("/api/sphere", "s2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(state.active_syncs.read().await.is_empty());
}

#[tokio::test]
async fn test_upstream_auth_failure_maps_to_401() {
    let mock = MockApi::start(MockData::default()).await;
    let state = test_app_state(&mock.base_url);

    let (status, body) = send(
        build_router(state.clone()),
        post_sync(json!({"mode": "full"}), "s1", Some("expired")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "NOT_AUTHENTICATED");

    let (_, progress) = send(build_router(state.clone()), get("/api/sync/status", "s1")).await;
    assert_eq!(progress["status"], "error");
    assert!(state.last_error.read().await.is_some());
}

#[tokio::test]
async fn test_concurrent_sync_for_same_session_conflicts() {
    let state = test_app_state("http://127.0.0.1:9");
    state
        .active_syncs
        .write()
        .await
        .insert("busy".to_string(), CancellationToken::new());

    let (status, body) = send(
        build_router(state.clone()),
        post_sync(json!({"mode": "quick"}), "busy", Some(TEST_TOKEN)),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn test_cancel_running_and_missing_sync() {
    let state = test_app_state("http://127.0.0.1:9");
    let token = CancellationToken::new();
    state
        .active_syncs
        .write()
        .await
        .insert("busy".to_string(), token.clone());

    let cancel = |session: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/sync/cancel")
            .header("x-session-id", session)
            .body(Body::empty())
            .unwrap()
    };

    let (status, body) = send(build_router(state.clone()), cancel("busy")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    assert!(token.is_cancelled());

    let (status, _) = send(build_router(state.clone()), cancel("idle")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_event_stream_starts_with_current_progress() {
    let app = build_router(test_app_state("http://127.0.0.1:9"));

    let response = app
        .oneshot(get("/api/sync/events?session_id=s1", "s1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/event-stream"));

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let chunk = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(chunk.contains("event: SyncProgressUpdated"), "{}", chunk);
    assert!(chunk.contains("\"idle\""), "{}", chunk);
}
