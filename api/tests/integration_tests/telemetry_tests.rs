//! Integration tests for telemetry ingestion and querying.
//!
//! Tests cover:
//! - Single and batch ingestion for all four telemetry kinds
//! - Validation failures with per-item details
//! - Filtering, time windows and pagination

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use super::common::{get, post_json, post_raw, test_app};

#[tokio::test]
async fn test_ingest_and_query_single_log() {
    let (app, _state) = test_app();

    let log = json!({
        "service": "payments",
        "level": "error",
        "message": "Database connection failed",
        "trace_id": "abc123"
    });

    let (status, response) = post_json(app.clone(), "/api/v1/telemetry/logs", log).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["accepted"], 1);
    assert_eq!(response["message"], "Ingested 1 log entry(s)");

    let (status, response) = get(app, "/api/v1/telemetry/logs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 1);

    let items = response["items"].as_array().unwrap();
    assert_eq!(items[0]["level"], "ERROR");
    assert_eq!(items[0]["service"], "payments");
    assert_eq!(items[0]["trace_id"], "abc123");
}

#[tokio::test]
async fn test_batch_validation_reports_indices() {
    let (app, state) = test_app();

    let logs = json!([
        {"service": "api", "level": "info", "message": "ok"},
        {"service": "api", "level": "info", "message": ""},
        {"service": "", "level": "info", "message": "no service"}
    ]);

    let (status, response) = post_json(app, "/api/v1/telemetry/logs", logs).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "validation_failed");

    let details = response["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["index"], 1);
    assert_eq!(details[1]["index"], 2);

    // Nothing from a rejected batch is stored
    assert_eq!(state.log_store().count().unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let (app, _state) = test_app();

    let (status, response) =
        post_raw(app, "/api/v1/telemetry/metrics", "{not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_json");
}

#[tokio::test]
async fn test_logs_pagination_newest_first() {
    let (app, _state) = test_app();
    let base = Utc::now() - Duration::minutes(30);

    let logs: Vec<_> = (0..5)
        .map(|i| {
            json!({
                "service": "api",
                "level": "info",
                "message": format!("log {i}"),
                "timestamp": (base + Duration::minutes(i)).to_rfc3339()
            })
        })
        .collect();
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/logs", json!(logs)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = get(app, "/api/v1/telemetry/logs?skip=1&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 5);
    assert_eq!(response["skip"], 1);
    assert_eq!(response["limit"], 2);

    let items = response["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["message"], "log 3");
    assert_eq!(items[1]["message"], "log 2");
}

#[tokio::test]
async fn test_query_time_window_is_half_open() {
    let (app, _state) = test_app();
    let start = Utc::now() - Duration::hours(2);
    let end = start + Duration::hours(1);

    let metrics = json!([
        {"service": "api", "metric_name": "cpu_usage", "value": 1.0, "timestamp": start.to_rfc3339()},
        {"service": "api", "metric_name": "cpu_usage", "value": 2.0, "timestamp": end.to_rfc3339()}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/metrics", metrics).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!(
        "/api/v1/telemetry/metrics?start_time={}&end_time={}",
        urlencoding::encode(&start.to_rfc3339()),
        urlencoding::encode(&end.to_rfc3339())
    );
    let (status, response) = get(app, &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 1);
    assert_eq!(response["items"][0]["value"], 1.0);
}

#[tokio::test]
async fn test_traces_filter_by_trace_id() {
    let (app, _state) = test_app();

    let spans = json!([
        {"trace_id": "t-1", "span_id": "root", "service": "gateway", "operation": "GET /cart", "duration_ms": 120.0},
        {"trace_id": "t-1", "span_id": "child", "parent_span_id": "root", "service": "cart", "operation": "load", "duration_ms": 80.0},
        {"trace_id": "t-2", "span_id": "other", "service": "gateway", "operation": "GET /", "duration_ms": 5.0}
    ]);
    let (status, response) = post_json(app.clone(), "/api/v1/telemetry/traces", spans).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["accepted"], 3);

    let (status, response) = get(app, "/api/v1/telemetry/traces?trace_id=t-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 2);
}

#[tokio::test]
async fn test_events_filter_by_type_and_service() {
    let (app, _state) = test_app();

    let events = json!([
        {"service": "checkout", "type": "deployment", "details": "v2.3.1", "severity": "info"},
        {"service": "checkout", "type": "restart", "details": "oom", "severity": "critical"},
        {"service": "auth", "type": "deployment", "details": "v1.0.9"}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/events", events).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) = get(
        app,
        "/api/v1/telemetry/events?service_name=checkout&event_type=deployment",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 1);
    assert_eq!(response["items"][0]["details"], "v2.3.1");
}

#[tokio::test]
async fn test_limit_out_of_range() {
    let (app, _state) = test_app();

    let (status, response) = get(app.clone(), "/api/v1/telemetry/traces?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "invalid_parameter");

    let (status, _) = get(app, "/api/v1/telemetry/events?limit=1001").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unstorable_timestamps_rejected_for_every_kind() {
    let (app, _state) = test_app();
    let ts = "2262-04-12T00:00:00Z";

    let bodies = [
        ("logs", json!({"service": "api", "message": "m", "timestamp": ts})),
        (
            "metrics",
            json!({"service": "api", "metric_name": "cpu", "value": 1.0, "timestamp": ts}),
        ),
        (
            "traces",
            json!({"trace_id": "t", "span_id": "s", "service": "api", "operation": "op", "duration_ms": 1.0, "timestamp": ts}),
        ),
        ("events", json!({"service": "api", "type": "restart", "timestamp": ts})),
    ];

    for (kind, body) in bodies {
        let (status, response) =
            post_json(app.clone(), &format!("/api/v1/telemetry/{kind}"), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{kind}");
        assert_eq!(response["error"], "validation_failed", "{kind}");
    }
}

#[tokio::test]
async fn test_far_future_end_time_filter() {
    let (app, _state) = test_app();

    let (status, _) = post_json(
        app.clone(),
        "/api/v1/telemetry/logs",
        json!({"service": "api", "message": "now"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, response) =
        get(app, "/api/v1/telemetry/logs?end_time=2300-01-01T00:00:00Z").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 1);
}

