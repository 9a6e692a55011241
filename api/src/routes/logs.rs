//! Log ingestion and query endpoints.

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
use shared::models::{LogEntry, LogLevel};
use shared::storage::LogQuery;

/// A log entry as received from the API.
///
/// This is similar to `LogEntry` but with optional timestamp (defaults to now).
#[derive(Debug, Deserialize)]
pub struct LogEntryRequest {
    /// Service name (required).
    #[serde(alias = "service_name")]
    pub service: String,

    /// Timestamp (optional, defaults to current time).
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Log level (optional, defaults to INFO).
    #[serde(default)]
    pub level: LogLevel,

    /// Log message (required).
    pub message: String,

    /// Trace ID for correlation (optional).
    #[serde(default)]
    pub trace_id: Option<String>,
}

impl From<LogEntryRequest> for LogEntry {
    fn from(req: LogEntryRequest) -> Self {
        Self {
            service: req.service,
            timestamp: req.timestamp,
            level: req.level,
            message: req.message,
            trace_id: req.trace_id,
        }
    }
}

/// Query parameters for listing logs.
#[derive(Debug, Deserialize)]
pub struct LogQueryParams {
    /// Items to skip.
    pub skip: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
    /// Filter by service.
    #[serde(alias = "service")]
    pub service_name: Option<String>,
    /// Filter by level.
    pub level: Option<LogLevel>,
    /// Inclusive lower time bound.
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub end_time: Option<DateTime<Utc>>,
}

/// Creates the log routes.
pub fn logs_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/telemetry/logs", post(ingest_logs).get(query_logs))
        .with_state(state)
}

/// Handler for log ingestion.
///
/// Accepts either a single log entry or a batch of log entries.
/// Returns 201 Created on success, 400 Bad Request on validation failure.
async fn ingest_logs(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest<LogEntryRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiFailure> {
    let Json(request) =
        payload.map_err(|rejection| bad_request("invalid_json", rejection.body_text()))?;

    let entries = validate_batch(request, "log entry", LogEntry::validate_entry)?;
    let count = entries.len();

    state.log_store().insert_batch(entries).map_err(storage_error)?;
    tracing::debug!(count, "Accepted log entries");

    Ok(accepted(count, "log entry"))
}

async fn query_logs(
    State(state): State<AppState>,
    Query(params): Query<LogQueryParams>,
) -> Result<Json<Page<LogEntry>>, ApiFailure> {
    let (skip, limit) = page_bounds(params.skip, params.limit)?;

    let mut query = LogQuery::new()
        .with_service_opt(params.service_name.as_deref())
        .with_offset(skip)
        .with_limit(limit);
    if let Some(level) = params.level {
        query = query.with_level(level);
    }
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    let result = state.log_store().query(query).map_err(storage_error)?;

    Ok(Json(Page {
        total: result.total_count,
        skip,
        limit,
        items: result.logs,
    }))
}
