//! Trace span ingestion and query endpoints.

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
use shared::models::TraceSpan;
use shared::storage::TraceQuery;

/// A span as received from the API.
#[derive(Debug, Deserialize)]
pub struct SpanRequest {
    /// Trace ID (required).
    pub trace_id: String,
    /// Span ID (required).
    pub span_id: String,
    /// Parent span ID (optional).
    #[serde(default)]
    pub parent_span_id: Option<String>,
    /// Service name (required).
    #[serde(alias = "service_name")]
    pub service: String,
    /// Operation name (required).
    pub operation: String,
    /// Duration in milliseconds (required).
    #[serde(alias = "duration")]
    pub duration_ms: f64,
    /// Timestamp (optional, defaults to current time).
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Outcome (optional).
    #[serde(default)]
    pub status: Option<String>,
}

impl From<SpanRequest> for TraceSpan {
    fn from(req: SpanRequest) -> Self {
        Self {
            trace_id: req.trace_id,
            span_id: req.span_id,
            parent_span_id: req.parent_span_id,
            service: req.service,
            operation: req.operation,
            duration_ms: req.duration_ms,
            timestamp: req.timestamp,
            status: req.status,
        }
    }
}

/// Query parameters for listing spans.
#[derive(Debug, Deserialize)]
pub struct TraceQueryParams {
    /// Items to skip.
    pub skip: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
    /// Filter by service.
    #[serde(alias = "service")]
    pub service_name: Option<String>,
    /// Filter by trace ID.
    pub trace_id: Option<String>,
    /// Filter by operation.
    pub operation: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Only spans slower than this (ms).
    pub min_duration_ms: Option<f64>,
    /// Inclusive lower time bound.
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub end_time: Option<DateTime<Utc>>,
}

/// Creates the trace routes.
pub fn traces_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/telemetry/traces",
            post(ingest_spans).get(query_spans),
        )
        .with_state(state)
}

async fn ingest_spans(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest<SpanRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiFailure> {
    let Json(request) =
        payload.map_err(|rejection| bad_request("invalid_json", rejection.body_text()))?;

    let spans = validate_batch(request, "span", TraceSpan::validate_span)?;
    let count = spans.len();

    state.trace_store().insert_batch(spans).map_err(storage_error)?;
    tracing::debug!(count, "Accepted spans");

    Ok(accepted(count, "span"))
}

async fn query_spans(
    State(state): State<AppState>,
    Query(params): Query<TraceQueryParams>,
) -> Result<Json<Page<TraceSpan>>, ApiFailure> {
    let (skip, limit) = page_bounds(params.skip, params.limit)?;

    let mut query = TraceQuery::new()
        .with_service_opt(params.service_name.as_deref())
        .with_offset(skip)
        .with_limit(limit);
    if let Some(trace_id) = params.trace_id {
        query = query.with_trace_id(trace_id);
    }
    if let Some(operation) = params.operation {
        query = query.with_operation(operation);
    }
    if let Some(status) = params.status {
        query = query.with_status(status);
    }
    if let Some(min) = params.min_duration_ms {
        query = query.with_min_duration_ms(min);
    }
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    let result = state.trace_store().query(query).map_err(storage_error)?;

    Ok(Json(Page {
        total: result.total_count,
        skip,
        limit,
        items: result.spans,
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
    async fn test_ingest_single_span() {
        let state = AppState::with_in_memory_store();
        let app = traces_routes(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/telemetry/traces")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{
                            "trace_id": "trace-123",
                            "span_id": "span-456",
                            "operation": "GET /orders",
                            "service": "api",
                            "duration_ms": 35.2
                        }"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(state.trace_store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ingest_rejects_negative_duration() {
        let app = traces_routes(AppState::with_in_memory_store());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/telemetry/traces")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"trace_id": "t", "span_id": "s", "operation": "op", "service": "api", "duration_ms": -1}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_query_slow_spans() {
        let state = AppState::with_in_memory_store();
        state
            .trace_store()
            .insert_batch(vec![
                TraceSpan::new("t1", "s1", "api", "GET /fast", 20.0),
                TraceSpan::new("t2", "s2", "api", "GET /slow", 2400.0),
            ])
            .unwrap();
        let app = traces_routes(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/telemetry/traces?min_duration_ms=2000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let page: Page<TraceSpan> = serde_json::from_slice(&body).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].operation, "GET /slow");
    }
}
