//! Metric ingestion and query endpoints.

use super::{
    accepted, bad_request, page_bounds, storage_error, validate_batch, ApiFailure,
    IngestRequest, IngestResponse, Page,
};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::models::MetricPoint;
use shared::storage::MetricQuery;

/// A metric sample as received from the API.
#[derive(Debug, Deserialize)]
pub struct MetricRequest {
    /// Service name (required).
    #[serde(alias = "service_name")]
    pub service: String,
    /// Metric name (required).
    pub metric_name: String,
    /// Sample value (required).
    pub value: f64,
    /// Unit (optional).
    #[serde(default)]
    pub unit: Option<String>,
    /// Timestamp (optional, defaults to current time).
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl From<MetricRequest> for MetricPoint {
    fn from(req: MetricRequest) -> Self {
        Self {
            service: req.service,
            metric_name: req.metric_name,
            value: req.value,
            unit: req.unit,
            timestamp: req.timestamp,
        }
    }
}

/// Query parameters for listing metric samples.
#[derive(Debug, Deserialize)]
pub struct MetricQueryParams {
    /// Items to skip.
    pub skip: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
    /// Filter by service.
    #[serde(alias = "service")]
    pub service_name: Option<String>,
    /// Filter by metric name.
    pub metric_name: Option<String>,
    /// Inclusive lower time bound.
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub end_time: Option<DateTime<Utc>>,
}

/// Creates the metric routes.
pub fn metrics_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/telemetry/metrics",
            post(ingest_metrics).get(query_metrics),
        )
        .with_state(state)
}

async fn ingest_metrics(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest<MetricRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiFailure> {
    let Json(request) =
        payload.map_err(|rejection| bad_request("invalid_json", rejection.body_text()))?;

    let points = validate_batch(request, "metric", MetricPoint::validate_metric)?;
    let count = points.len();

    state
        .metric_store()
        .insert_batch(points)
        .map_err(storage_error)?;
    tracing::debug!(count, "Accepted metric samples");

    Ok(accepted(count, "metric"))
}

async fn query_metrics(
    State(state): State<AppState>,
    Query(params): Query<MetricQueryParams>,
) -> Result<Json<Page<MetricPoint>>, ApiFailure> {
    let (skip, limit) = page_bounds(params.skip, params.limit)?;

    let mut query = MetricQuery::new()
        .with_service_opt(params.service_name.as_deref())
        .with_offset(skip)
        .with_limit(limit);
    if let Some(name) = params.metric_name {
        query = query.with_metric_name(name);
    }
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    let result = state.metric_store().query(query).map_err(storage_error)?;

    Ok(Json(Page {
        total: result.total_count,
        skip,
        limit,
        items: result.metrics,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_ingest_batch_metrics() {
        let state = AppState::with_in_memory_store();
        let app = metrics_routes(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/telemetry/metrics")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"[
                            {"service": "api", "metric_name": "cpu_usage", "value": 71.5, "unit": "percent"},
                            {"service": "api", "metric_name": "memory_usage", "value": 1024}
                        ]"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(state.metric_store().count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_metric_name() {
        let app = metrics_routes(AppState::with_in_memory_store());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/telemetry/metrics")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"service": "api", "metric_name": "", "value": 1}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_metrics_by_name() {
        let state = AppState::with_in_memory_store();
        state
            .metric_store()
            .insert_batch(vec![
                MetricPoint::new("api", "cpu_usage", 10.0),
                MetricPoint::new("api", "memory_usage", 20.0),
            ])
            .unwrap();
        let app = metrics_routes(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/telemetry/metrics?metric_name=cpu_usage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page: Page<MetricPoint> = serde_json::from_slice(&body).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.limit, 100);
        assert_eq!(page.items[0].metric_name, "cpu_usage");
    }
}
