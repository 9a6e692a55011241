//! Integration tests for the statistics endpoints.

use axum::http::StatusCode;
use serde_json::json;

use super::common::{get, post_json, test_app};

#[tokio::test]
async fn test_log_statistics_error_rate() {
    let (app, _state) = test_app();

    let logs = json!([
        {"service": "api", "level": "ERROR", "message": "a"},
        {"service": "api", "level": "ERROR", "message": "b"},
        {"service": "api", "level": "INFO", "message": "c"},
        {"service": "api", "level": "DEBUG", "message": "d"}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/logs", logs).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, stats) = get(app, "/api/v1/telemetry/logs/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_logs"], 4);
    assert_eq!(stats["error_count"], 2);
    assert_eq!(stats["debug_count"], 1);
    assert_eq!(stats["error_rate"], 50.0);
}

#[tokio::test]
async fn test_latency_statistics_bounds() {
    let (app, _state) = test_app();

    let spans: Vec<_> = (1..=10)
        .map(|i| {
            json!({
                "trace_id": format!("t{i}"),
                "span_id": format!("s{i}"),
                "service": "api",
                "operation": "GET /items",
                "duration_ms": f64::from(i) * 100.0
            })
        })
        .collect();
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/traces", json!(spans)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, stats) = get(
        app,
        "/api/v1/telemetry/latency/statistics?operation=GET%20/items",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["count"], 10);
    assert_eq!(stats["min_latency"], 100.0);
    assert_eq!(stats["max_latency"], 1000.0);
    assert_eq!(stats["avg_latency"], 550.0);

    let p50 = stats["p50_latency"].as_f64().unwrap();
    let p95 = stats["p95_latency"].as_f64().unwrap();
    let p99 = stats["p99_latency"].as_f64().unwrap();
    assert!(100.0 <= p50 && p50 <= p95 && p95 <= p99 && p99 <= 1000.0);
}

#[tokio::test]
async fn test_event_statistics_groups() {
    let (app, _state) = test_app();

    let events = json!([
        {"service": "api", "type": "deployment", "severity": "info"},
        {"service": "api", "type": "deployment", "severity": "warning"},
        {"service": "api", "type": "restart", "severity": "critical"}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/events", events).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, stats) = get(app, "/api/v1/telemetry/events/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_events"], 3);
    assert_eq!(stats["by_type"]["deployment"], 2);
    assert_eq!(stats["by_type"]["restart"], 1);
    assert_eq!(stats["by_type"]["scaling"], 0);
    assert_eq!(stats["by_severity"]["critical"], 1);
}

#[tokio::test]
async fn test_services_listing() {
    let (app, _state) = test_app();

    let (status, _) = post_json(
        app.clone(),
        "/api/v1/telemetry/events",
        json!({"service": "search", "type": "scaling"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = post_json(
        app.clone(),
        "/api/v1/telemetry/logs",
        json!({"service": "billing", "level": "info", "message": "hi"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = get(app, "/api/v1/telemetry/services").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["services"], json!(["billing", "search"]));
}
