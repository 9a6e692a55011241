//! Common test utilities and helpers for integration tests.

use api::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;

/// Creates a test router with fresh in-memory stores and no LLM.
///
/// # Returns
///
/// A tuple containing the configured router and the app state.
pub fn test_app() -> (Router, AppState) {
    let state = AppState::with_in_memory_store();
    let router = create_router(state.clone());
    (router, state)
}

/// Helper to make a POST request with JSON body.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, uri, serde_json::to_string(&body).unwrap()).await
}

/// Helper to make a POST request with an arbitrary body.
pub async fn post_raw(app: Router, uri: &str, body: String) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap();

    read_json(response).await
}

/// Helper to make a GET request.
///
/// # Returns
///
/// A tuple containing the response status code and parsed JSON response body.
pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = tower::ServiceExt::oneshot(
        app,
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

    (status, json)
}
