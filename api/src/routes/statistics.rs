//! Statistics endpoints over stored telemetry.

use super::{bad_request, storage_error, ApiFailure};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::analysis::{EventStatistics, LatencyStatistics, LogStatistics, MetricStatistics};
use shared::storage::{EventQuery, LogQuery, MetricQuery, TraceQuery};

/// Filters accepted by every statistics endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct StatisticsParams {
    /// Restrict to one service.
    #[serde(alias = "service")]
    pub service_name: Option<String>,
    /// Inclusive lower time bound.
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub end_time: Option<DateTime<Utc>>,
    /// Span operation (latency only).
    pub operation: Option<String>,
    /// Metric name (required for metric statistics).
    pub metric_name: Option<String>,
}

/// Response listing known services.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServicesResponse {
    /// Sorted service names.
    pub services: Vec<String>,
}

/// Creates the statistics routes.
pub fn statistics_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/telemetry/logs/statistics", get(log_stats))
        .route("/api/v1/telemetry/latency/statistics", get(latency_stats))
        .route("/api/v1/telemetry/metrics/statistics", get(metric_stats))
        .route("/api/v1/telemetry/events/statistics", get(event_stats))
        .route("/api/v1/telemetry/services", get(list_services))
        .with_state(state)
}

async fn log_stats(
    State(state): State<AppState>,
    Query(params): Query<StatisticsParams>,
) -> Result<Json<LogStatistics>, ApiFailure> {
    let mut query = LogQuery::new().with_service_opt(params.service_name.as_deref());
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    state
        .dashboard()
        .log_statistics(query)
        .map(Json)
        .map_err(storage_error)
}

async fn latency_stats(
    State(state): State<AppState>,
    Query(params): Query<StatisticsParams>,
) -> Result<Json<LatencyStatistics>, ApiFailure> {
    let mut query = TraceQuery::new().with_service_opt(params.service_name.as_deref());
    if let Some(operation) = params.operation {
        query = query.with_operation(operation);
    }
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    state
        .dashboard()
        .latency_statistics(query)
        .map(Json)
        .map_err(storage_error)
}

async fn metric_stats(
    State(state): State<AppState>,
    Query(params): Query<StatisticsParams>,
) -> Result<Json<MetricStatistics>, ApiFailure> {
    let Some(metric_name) = params.metric_name.filter(|name| !name.is_empty()) else {
        return Err(bad_request(
            "invalid_parameter",
            "metric_name query parameter is required",
        ));
    };

    let mut query = MetricQuery::new()
        .with_service_opt(params.service_name.as_deref())
        .with_metric_name(metric_name);
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    state
        .dashboard()
        .metric_statistics(query)
        .map(Json)
        .map_err(storage_error)
}

async fn event_stats(
    State(state): State<AppState>,
    Query(params): Query<StatisticsParams>,
) -> Result<Json<EventStatistics>, ApiFailure> {
    let mut query = EventQuery::new().with_service_opt(params.service_name.as_deref());
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    state
        .dashboard()
        .event_statistics(query)
        .map(Json)
        .map_err(storage_error)
}

async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ServicesResponse>, ApiFailure> {
    let services = state.dashboard().service_list().map_err(storage_error)?;
    Ok(Json(ServicesResponse { services }))
}
