//! Dashboard endpoints: fleet health, critical services, correlation and
//! incident analysis.

use super::{bad_request, storage_error, ApiFailure};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::ai::SeverityClassification;
use shared::analysis::ServiceHealth;
use shared::dashboard::{CorrelationAnalysis, DashboardOverview, IncidentVolume};
use std::ops::RangeInclusive;

/// Accepted window for most dashboard views (one week).
const HOURS_RANGE: RangeInclusive<u32> = 1..=168;
/// Accepted window for incident volume (thirty days).
const VOLUME_HOURS_RANGE: RangeInclusive<u32> = 1..=720;
/// Accepted size of the critical services list.
const CRITICAL_LIMIT_RANGE: RangeInclusive<usize> = 1..=50;

const DEFAULT_HOURS: u32 = 1;
const DEFAULT_VOLUME_HOURS: u32 = 24;
const DEFAULT_CRITICAL_LIMIT: usize = 10;

/// Time window parameter.
#[derive(Debug, Default, Deserialize)]
pub struct WindowParams {
    /// Window size in hours.
    pub hours: Option<u32>,
}

/// Parameters for the critical services view.
#[derive(Debug, Default, Deserialize)]
pub struct CriticalParams {
    /// Window size in hours.
    pub hours: Option<u32>,
    /// Maximum number of services returned.
    pub limit: Option<usize>,
}

/// Parameters for service-scoped analyses.
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisParams {
    /// Restrict to one service.
    #[serde(alias = "service")]
    pub service_name: Option<String>,
    /// Window size in hours.
    pub hours: Option<u32>,
}

/// Health of every known service.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceHealthList {
    /// One entry per service.
    pub data: Vec<ServiceHealth>,
}

/// Services needing attention.
#[derive(Debug, Serialize, Deserialize)]
pub struct CriticalServicesResponse {
    /// Degraded and critical services, worst first.
    pub services: Vec<ServiceHealth>,
    /// Number of entries in `services`.
    pub count: usize,
    /// When the list was computed.
    pub timestamp: DateTime<Utc>,
}

/// Creates the dashboard routes.
pub fn dashboard_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/dashboard/overview", get(overview))
        .route("/api/v1/dashboard/services/health", get(services_health))
        .route("/api/v1/dashboard/services/critical", get(critical_services))
        .route(
            "/api/v1/dashboard/services/{service_name}/health",
            get(service_health),
        )
        .route(
            "/api/v1/dashboard/correlation-engine",
            get(correlation_engine),
        )
        .route(
            "/api/v1/dashboard/metrics/incident-volume",
            get(incident_volume),
        )
        .route("/api/v1/dashboard/incident-severity", get(incident_severity))
        .with_state(state)
}

fn checked<T>(
    name: &str,
    value: Option<T>,
    default: T,
    range: &RangeInclusive<T>,
) -> Result<T, ApiFailure>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    let value = value.unwrap_or(default);
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(bad_request(
            "invalid_parameter",
            format!(
                "{name} must be between {} and {}",
                range.start(),
                range.end()
            ),
        ))
    }
}

fn window(hours: Option<u32>) -> Result<u32, ApiFailure> {
    checked("hours", hours, DEFAULT_HOURS, &HOURS_RANGE)
}

async fn overview(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<DashboardOverview>, ApiFailure> {
    let hours = window(params.hours)?;
    state
        .dashboard()
        .overview(hours)
        .map(Json)
        .map_err(storage_error)
}

async fn services_health(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<ServiceHealthList>, ApiFailure> {
    let hours = window(params.hours)?;
    let data = state
        .dashboard()
        .services_health(hours)
        .map_err(storage_error)?;
    Ok(Json(ServiceHealthList { data }))
}

async fn service_health(
    State(state): State<AppState>,
    Path(service_name): Path<String>,
    Query(params): Query<WindowParams>,
) -> Result<Json<ServiceHealth>, ApiFailure> {
    let hours = window(params.hours)?;
    state
        .dashboard()
        .service_health(&service_name, hours)
        .map(Json)
        .map_err(storage_error)
}

async fn critical_services(
    State(state): State<AppState>,
    Query(params): Query<CriticalParams>,
) -> Result<Json<CriticalServicesResponse>, ApiFailure> {
    let hours = window(params.hours)?;
    let limit = checked(
        "limit",
        params.limit,
        DEFAULT_CRITICAL_LIMIT,
        &CRITICAL_LIMIT_RANGE,
    )?;

    let services = state
        .dashboard()
        .critical_services(hours, limit)
        .map_err(storage_error)?;

    Ok(Json(CriticalServicesResponse {
        count: services.len(),
        services,
        timestamp: Utc::now(),
    }))
}

async fn correlation_engine(
    State(state): State<AppState>,
    Query(params): Query<AnalysisParams>,
) -> Result<Json<CorrelationAnalysis>, ApiFailure> {
    let hours = window(params.hours)?;
    state
        .dashboard()
        .correlation_analysis(params.service_name.as_deref(), hours)
        .await
        .map(Json)
        .map_err(storage_error)
}

async fn incident_volume(
    State(state): State<AppState>,
    Query(params): Query<AnalysisParams>,
) -> Result<Json<IncidentVolume>, ApiFailure> {
    let hours = checked(
        "hours",
        params.hours,
        DEFAULT_VOLUME_HOURS,
        &VOLUME_HOURS_RANGE,
    )?;
    state
        .dashboard()
        .incident_volume(params.service_name.as_deref(), hours)
        .map(Json)
        .map_err(storage_error)
}

async fn incident_severity(
    State(state): State<AppState>,
    Query(params): Query<WindowParams>,
) -> Result<Json<SeverityClassification>, ApiFailure> {
    let hours = window(params.hours)?;
    state
        .dashboard()
        .incident_severity(hours)
        .await
        .map(Json)
        .map_err(storage_error)
}
