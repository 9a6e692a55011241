//! API route definitions.
//!
//! This module organizes all HTTP routes for the Triage API server and the
//! request/response plumbing they share.

mod dashboard;
mod events;
mod health;
mod logs;
mod metrics;
mod statistics;
mod traces;

pub use dashboard::dashboard_routes;
pub use events::events_routes;
pub use health::health_routes;
pub use logs::logs_routes;
pub use metrics::metrics_routes;
pub use statistics::statistics_routes;
pub use traces::traces_routes;

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Default page size for telemetry listings.
pub(crate) const DEFAULT_PAGE_SIZE: usize = 100;
/// Largest accepted page size for telemetry listings.
pub(crate) const MAX_PAGE_SIZE: usize = 1000;

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    /// Error type.
    pub error: String,
    /// Detailed error message.
    pub message: String,
    /// Validation errors by index (for batch requests).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

/// Validation error detail for a specific batch item.
#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Index in the batch (0 for single requests).
    pub index: usize,
    /// Error message.
    pub message: String,
}

/// Error half of every handler result.
pub(crate) type ApiFailure = (StatusCode, Json<ApiError>);

pub(crate) fn bad_request(error: &str, message: impl Into<String>) -> ApiFailure {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: error.to_string(),
            message: message.into(),
            details: None,
        }),
    )
}

pub(crate) fn storage_error(e: impl Display) -> ApiFailure {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError {
            error: "storage_error".to_string(),
            message: e.to_string(),
            details: None,
        }),
    )
}

/// Request body for ingestion - either a single item or a batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngestRequest<T> {
    /// A single item.
    Single(T),
    /// A batch of items.
    Batch(Vec<T>),
}

impl<T> IngestRequest<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Single(item) => vec![item],
            Self::Batch(items) => items,
        }
    }
}

/// Response for successful ingestion.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Number of items accepted.
    pub accepted: usize,
    /// Message describing the result.
    pub message: String,
}

/// Converts and validates an ingestion request.
///
/// Rejects empty batches and reports every invalid item with its index.
pub(crate) fn validate_batch<R, T, E>(
    request: IngestRequest<R>,
    noun: &str,
    validate: impl Fn(&T) -> Result<(), E>,
) -> Result<Vec<T>, ApiFailure>
where
    R: Into<T>,
    E: Display,
{
    let items = request.into_vec();
    if items.is_empty() {
        return Err(bad_request(
            "empty_batch",
            format!("At least one {noun} is required"),
        ));
    }

    let mut errors = Vec::new();
    let mut valid = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let item: T = item.into();
        match validate(&item) {
            Ok(()) => valid.push(item),
            Err(e) => errors.push(ValidationErrorDetail {
                index,
                message: e.to_string(),
            }),
        }
    }

    if !errors.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "validation_failed".to_string(),
                message: format!("{} {noun}(s) failed validation", errors.len()),
                details: Some(errors),
            }),
        ));
    }

    Ok(valid)
}

pub(crate) fn accepted(count: usize, noun: &str) -> (StatusCode, Json<IngestResponse>) {
    (
        StatusCode::CREATED,
        Json(IngestResponse {
            accepted: count,
            message: format!("Ingested {count} {noun}(s)"),
        }),
    )
}

/// Resolves `skip`/`limit` query parameters.
///
/// `limit` defaults to 100 and must lie in `1..=1000`.
pub(crate) fn page_bounds(
    skip: Option<usize>,
    limit: Option<usize>,
) -> Result<(usize, usize), ApiFailure> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(bad_request(
            "invalid_parameter",
            format!("limit must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    Ok((skip.unwrap_or(0), limit))
}

/// Paginated listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    /// Number of matching items before pagination.
    pub total: usize,
    /// Items skipped.
    pub skip: usize,
    /// Page size.
    pub limit: usize,
    /// Items on this page.
    pub items: Vec<T>,
}
