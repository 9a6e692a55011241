//! Event ingestion and query endpoints.

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
use shared::models::{Event, EventSeverity};
use shared::storage::EventQuery;

/// An event as received from the API.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// Service name (required).
    #[serde(alias = "service_name")]
    pub service: String,
    /// Event type (required).
    #[serde(rename = "type", alias = "event_type")]
    pub event_type: String,
    /// Free-text details (optional).
    #[serde(default, alias = "description")]
    pub details: String,
    /// Severity (optional, defaults to info).
    #[serde(default)]
    pub severity: EventSeverity,
    /// Timestamp (optional, defaults to current time).
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl From<EventRequest> for Event {
    fn from(req: EventRequest) -> Self {
        Self {
            service: req.service,
            timestamp: req.timestamp,
            event_type: req.event_type,
            details: req.details,
            severity: req.severity,
        }
    }
}

/// Query parameters for listing events.
#[derive(Debug, Deserialize)]
pub struct EventQueryParams {
    /// Items to skip.
    pub skip: Option<usize>,
    /// Page size.
    pub limit: Option<usize>,
    /// Filter by service.
    #[serde(alias = "service")]
    pub service_name: Option<String>,
    /// Filter by event type.
    pub event_type: Option<String>,
    /// Filter by severity.
    pub severity: Option<EventSeverity>,
    /// Inclusive lower time bound.
    pub start_time: Option<DateTime<Utc>>,
    /// Exclusive upper time bound.
    pub end_time: Option<DateTime<Utc>>,
}

/// Creates the event routes.
pub fn events_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/telemetry/events",
            post(ingest_events).get(query_events),
        )
        .with_state(state)
}

async fn ingest_events(
    State(state): State<AppState>,
    payload: Result<Json<IngestRequest<EventRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), ApiFailure> {
    let Json(request) =
        payload.map_err(|rejection| bad_request("invalid_json", rejection.body_text()))?;

    let events = validate_batch(request, "event", Event::validate_event)?;
    let count = events.len();

    state.event_store().insert_batch(events).map_err(storage_error)?;
    tracing::debug!(count, "Accepted events");

    Ok(accepted(count, "event"))
}

async fn query_events(
    State(state): State<AppState>,
    Query(params): Query<EventQueryParams>,
) -> Result<Json<Page<Event>>, ApiFailure> {
    let (skip, limit) = page_bounds(params.skip, params.limit)?;

    let mut query = EventQuery::new()
        .with_service_opt(params.service_name.as_deref())
        .with_offset(skip)
        .with_limit(limit);
    if let Some(event_type) = params.event_type {
        query = query.with_event_type(event_type);
    }
    if let Some(severity) = params.severity {
        query = query.with_severity(severity);
    }
    if let Some(start) = params.start_time {
        query = query.with_start_time(start);
    }
    if let Some(end) = params.end_time {
        query = query.with_end_time(end);
    }

    let result = state.event_store().query(query).map_err(storage_error)?;

    Ok(Json(Page {
        total: result.total_count,
        skip,
        limit,
        items: result.events,
    }))
}
