//! Integration tests for the dashboard endpoints.
//!
//! Tests cover:
//! - Overview totals and per-status counts
//! - Critical service ordering and limits
//! - Correlation analysis without an LLM configured
//! - Incident volume buckets

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use super::common::{get, post_json, test_app};

fn log(service: &str, level: &str, ts: DateTime<Utc>) -> Value {
    json!({
        "service": service,
        "level": level,
        "message": format!("{level} from {service}"),
        "timestamp": ts.to_rfc3339()
    })
}

/// Seeds three services: `payments` critical (error rate), `search`
/// degraded (error rate) and `auth` healthy.
async fn seed_fleet(app: &axum::Router) {
    let ts = Utc::now() - Duration::minutes(15);
    let mut logs = Vec::new();

    // payments: 5 / 10 errors
    for i in 0..10 {
        logs.push(log("payments", if i < 5 { "error" } else { "info" }, ts));
    }
    // search: 3 / 20 errors
    for i in 0..20 {
        logs.push(log("search", if i < 3 { "error" } else { "info" }, ts));
    }
    // auth: no errors
    for _ in 0..5 {
        logs.push(log("auth", "info", ts));
    }

    let (status, response) = post_json(app.clone(), "/api/v1/telemetry/logs", json!(logs)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["accepted"], 35);
}

#[tokio::test]
async fn test_overview_status_counts() {
    let (app, _state) = test_app();
    seed_fleet(&app).await;

    let (status, overview) = get(app, "/api/v1/dashboard/overview?hours=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["total_services"], 3);
    assert_eq!(overview["healthy_services"], 1);
    assert_eq!(overview["degraded_services"], 1);
    assert_eq!(overview["critical_services"], 1);
    assert_eq!(overview["total_logs"], 35);
    assert_eq!(overview["service_health"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_old_telemetry_falls_outside_window() {
    let (app, _state) = test_app();

    let old = Utc::now() - Duration::hours(3);
    let (status, _) = post_json(
        app.clone(),
        "/api/v1/telemetry/logs",
        json!([log("legacy", "error", old)]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, health) = get(app.clone(), "/api/v1/dashboard/services/legacy/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["total_logs"], 0);
    assert_eq!(health["status"], "healthy");

    let (status, health) =
        get(app, "/api/v1/dashboard/services/legacy/health?hours=4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["total_logs"], 1);
    assert_eq!(health["status"], "critical");
}

#[tokio::test]
async fn test_critical_services_worst_first() {
    let (app, _state) = test_app();
    seed_fleet(&app).await;

    let (status, response) = get(app.clone(), "/api/v1/dashboard/services/critical").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["count"], 2);
    assert_eq!(response["services"][0]["service_name"], "payments");
    assert_eq!(response["services"][0]["severity_score"], 3);
    assert_eq!(response["services"][1]["service_name"], "search");
    assert_eq!(response["services"][1]["status"], "degraded");

    let (status, response) = get(app, "/api/v1/dashboard/services/critical?limit=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["count"], 1);
    assert_eq!(response["services"][0]["service_name"], "payments");
}

#[tokio::test]
async fn test_slow_spans_degrade_service() {
    let (app, _state) = test_app();

    let spans = json!([
        {"trace_id": "t1", "span_id": "s1", "service": "reports", "operation": "export", "duration_ms": 2500.0},
        {"trace_id": "t2", "span_id": "s2", "service": "reports", "operation": "export", "duration_ms": 2700.0}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/traces", spans).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, health) = get(app, "/api/v1/dashboard/services/reports/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["avg_latency"], 2600.0);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["severity_score"], 2);
}

#[tokio::test]
async fn test_correlation_engine_counts_events_near_errors() {
    let (app, _state) = test_app();
    let t = Utc::now() - Duration::minutes(20);

    // 10 errors spread over one minute
    let logs: Vec<_> = (0..10)
        .map(|i| log("checkout", "error", t + Duration::seconds(i * 6)))
        .collect();
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/logs", json!(logs)).await;
    assert_eq!(status, StatusCode::CREATED);

    // Two events inside [first error, last error + 5min], one after it
    let events = json!([
        {"service": "checkout", "type": "deployment", "timestamp": (t + Duration::seconds(10)).to_rfc3339()},
        {"service": "checkout", "type": "config_change", "timestamp": (t + Duration::seconds(70)).to_rfc3339()},
        {"service": "checkout", "type": "restart", "timestamp": (t + Duration::seconds(400)).to_rfc3339()}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/events", events).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, analysis) = get(
        app,
        "/api/v1/dashboard/correlation-engine?service_name=checkout",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["error_logs_count"], 10);
    assert_eq!(analysis["events_count"], 3);
    assert_eq!(analysis["slow_traces_count"], 0);

    let correlations = analysis["correlations"].as_array().unwrap();
    assert_eq!(correlations.len(), 1);
    assert_eq!(correlations[0]["type"], "event_error_correlation");
    assert_eq!(correlations[0]["event_count"], 2);
    assert_eq!(correlations[0]["confidence"], 0.2);

    // No LLM configured: degraded, never an error
    assert_eq!(analysis["ai_prediction"]["root_cause"], Value::Null);
    assert_eq!(analysis["ai_prediction"]["confidence"], 0.0);
    assert!(!analysis["ai_prediction"]["reasoning"]
        .as_str()
        .unwrap()
        .is_empty());
    assert_eq!(analysis["correlation_score"], 0.0);
}

#[tokio::test]
async fn test_correlation_engine_slow_traces() {
    let (app, _state) = test_app();
    let t = Utc::now() - Duration::minutes(10);

    let (status, _) = post_json(
        app.clone(),
        "/api/v1/telemetry/logs",
        json!([log("orders", "error", t), log("orders", "error", t)]),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let spans = json!([
        {"trace_id": "a", "span_id": "1", "service": "orders", "operation": "db.query", "duration_ms": 3000.0, "timestamp": (t + Duration::seconds(5)).to_rfc3339()},
        {"trace_id": "b", "span_id": "2", "service": "orders", "operation": "db.query", "duration_ms": 5000.0, "timestamp": (t + Duration::seconds(9)).to_rfc3339()},
        {"trace_id": "c", "span_id": "3", "service": "orders", "operation": "db.query", "duration_ms": 30.0, "timestamp": (t + Duration::seconds(9)).to_rfc3339()}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/traces", spans).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, analysis) = get(app, "/api/v1/dashboard/correlation-engine").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analysis["service_name"], "all");
    assert_eq!(analysis["slow_traces_count"], 2);

    let correlation = &analysis["correlations"][0];
    assert_eq!(correlation["type"], "latency_error_correlation");
    assert_eq!(correlation["slow_trace_count"], 2);
    assert_eq!(correlation["avg_slow_duration"], 4000.0);
    assert_eq!(correlation["confidence"], 1.0);
}

#[tokio::test]
async fn test_incident_volume_hourly_buckets() {
    let (app, _state) = test_app();
    let now = Utc::now();

    let events = json!([
        {"service": "api", "type": "restart", "timestamp": (now - Duration::hours(5)).to_rfc3339()},
        {"service": "api", "type": "restart", "timestamp": (now - Duration::hours(5)).to_rfc3339()},
        {"service": "api", "type": "deployment", "timestamp": (now - Duration::hours(2)).to_rfc3339()},
        {"service": "web", "type": "deployment", "timestamp": (now - Duration::hours(2)).to_rfc3339()},
        {"service": "api", "type": "scaling", "timestamp": (now - Duration::hours(30)).to_rfc3339()}
    ]);
    let (status, _) = post_json(app.clone(), "/api/v1/telemetry/events", events).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, volume) = get(
        app.clone(),
        "/api/v1/dashboard/metrics/incident-volume?service_name=api",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(volume["service_name"], "api");

    let points = volume["data_points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["incident_count"], 2);
    assert_eq!(points[1]["incident_count"], 1);
    let first = points[0]["timestamp"].as_str().unwrap();
    let second = points[1]["timestamp"].as_str().unwrap();
    assert!(first.ends_with(":00:00"));
    assert!(first < second);

    let (status, volume) = get(app, "/api/v1/dashboard/metrics/incident-volume?hours=721").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(volume["error"], "invalid_parameter");
}

#[tokio::test]
async fn test_incident_severity_without_llm() {
    let (app, _state) = test_app();
    seed_fleet(&app).await;

    let (status, severity) = get(app, "/api/v1/dashboard/incident-severity").await;
    assert_eq!(status, StatusCode::OK);
    // 8 errors in 35 logs is below the heuristic's critical threshold
    assert_eq!(severity["severity"], "medium");
    assert_eq!(severity["confidence"], 0.5);
    assert_eq!(severity["factors"]["error_count"], 8);
    assert_eq!(severity["factors"]["affected_services"], 2);
}
