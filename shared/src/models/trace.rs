//! Trace span data model.
//!
//! Spans are stored flat, one row per span. Grouping into traces is done by
//! `trace_id` at query time when needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Spans slower than this many milliseconds count as slow.
pub const SLOW_SPAN_THRESHOLD_MS: f64 = 2000.0;

/// A single timed operation within a distributed trace.
///
/// # Example
///
/// ```
/// use shared::models::TraceSpan;
///
/// let span = TraceSpan::new("trace-1", "span-1", "checkout", "POST /orders", 2500.0)
///     .with_parent("span-0")
///     .with_status("error");
///
/// assert!(span.validate_span().is_ok());
/// assert!(span.is_slow());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TraceSpan {
    /// Identifier of the trace this span belongs to.
    #[validate(length(min = 1, message = "Trace ID cannot be empty"))]
    pub trace_id: String,

    /// Identifier of this span.
    #[validate(length(min = 1, message = "Span ID cannot be empty"))]
    pub span_id: String,

    /// The parent span ID (None for root spans).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,

    /// The service that generated this span.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// The operation this span measured.
    #[validate(length(min = 1, message = "Operation cannot be empty"))]
    pub operation: String,

    /// Duration in milliseconds.
    pub duration_ms: f64,

    /// Timestamp when the span was recorded.
    pub timestamp: DateTime<Utc>,

    /// Free-text outcome (e.g. "success", "error").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Errors that can occur during span validation.
#[derive(Debug, Error)]
pub enum SpanValidationError {
    /// The trace ID is empty.
    #[error("Trace ID cannot be empty")]
    EmptyTraceId,

    /// The span ID is empty.
    #[error("Span ID cannot be empty")]
    EmptySpanId,

    /// The service name is empty.
    #[error("Service name cannot be empty")]
    EmptyService,

    /// The operation is empty.
    #[error("Operation cannot be empty")]
    EmptyOperation,

    /// The duration is negative or not finite.
    #[error("Duration must be a non-negative finite number of milliseconds")]
    InvalidDuration,

    /// The timestamp cannot be stored as nanoseconds since the epoch.
    #[error("Timestamp {0} is outside the storable range (1677-09-21 to 2262-04-11)")]
    TimestampOutOfRange(DateTime<Utc>),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl TraceSpan {
    /// Creates a new span recorded now.
    #[must_use]
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        service: impl Into<String>,
        operation: impl Into<String>,
        duration_ms: f64,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id: None,
            service: service.into(),
            operation: operation.into(),
            duration_ms,
            timestamp: Utc::now(),
            status: None,
        }
    }

    /// Sets the parent span ID.
    #[must_use]
    pub fn with_parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    /// Sets the span status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Sets the timestamp of the span.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Returns true if the span took longer than [`SLOW_SPAN_THRESHOLD_MS`].
    #[must_use]
    pub fn is_slow(&self) -> bool {
        self.duration_ms > SLOW_SPAN_THRESHOLD_MS
    }

    /// Returns true if this span has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_none()
    }

    /// Validates the span.
    ///
    /// # Errors
    ///
    /// Returns an error if any identifier, the service or the operation is
    /// empty, or if the duration is negative or not finite.
    pub fn validate_span(&self) -> Result<(), SpanValidationError> {
        if self.trace_id.is_empty() {
            return Err(SpanValidationError::EmptyTraceId);
        }
        if self.span_id.is_empty() {
            return Err(SpanValidationError::EmptySpanId);
        }
        if self.service.is_empty() {
            return Err(SpanValidationError::EmptyService);
        }
        if self.operation.is_empty() {
            return Err(SpanValidationError::EmptyOperation);
        }
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(SpanValidationError::InvalidDuration);
        }
        if !super::storable_timestamp(self.timestamp) {
            return Err(SpanValidationError::TimestampOutOfRange(self.timestamp));
        }
        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_new() {
        let span = TraceSpan::new("trace-1", "span-1", "api", "GET /users", 12.5);

        assert_eq!(span.trace_id, "trace-1");
        assert_eq!(span.operation, "GET /users");
        assert!(span.is_root());
        assert!(span.status.is_none());
    }

    #[test]
    fn test_span_slow_threshold_is_exclusive() {
        let at_threshold = TraceSpan::new("t", "s", "api", "op", 2000.0);
        let above = TraceSpan::new("t", "s", "api", "op", 2000.5);

        assert!(!at_threshold.is_slow());
        assert!(above.is_slow());
    }

    #[test]
    fn test_span_validation_negative_duration() {
        let span = TraceSpan::new("t", "s", "api", "op", -1.0);
        assert!(matches!(
            span.validate_span(),
            Err(SpanValidationError::InvalidDuration)
        ));
    }

    #[test]
    fn test_span_validation_empty_trace_id() {
        let span = TraceSpan::new("", "s", "api", "op", 1.0);
        assert!(matches!(
            span.validate_span(),
            Err(SpanValidationError::EmptyTraceId)
        ));
    }

    #[test]
    fn test_span_deserialization() {
        let json = r#"{
            "trace_id": "abc",
            "span_id": "def",
            "parent_span_id": "ghi",
            "service": "payments",
            "operation": "charge",
            "duration_ms": 3100.0,
            "timestamp": "2024-01-15T10:30:00Z",
            "status": "error"
        }"#;

        let span: TraceSpan = serde_json::from_str(json).unwrap();

        assert_eq!(span.parent_span_id.as_deref(), Some("ghi"));
        assert_eq!(span.status.as_deref(), Some("error"));
        assert!(span.is_slow());
    }

    #[test]
    fn test_span_validation_timestamp_bounds() {
        let last_storable = DateTime::from_timestamp_nanos(i64::MAX);
        let span = TraceSpan::new("t", "s", "api", "op", 1.0).with_timestamp(last_storable);
        assert!(span.validate_span().is_ok());

        let beyond = last_storable + chrono::Duration::seconds(1);
        let span = span.with_timestamp(beyond);
        assert!(matches!(
            span.validate_span(),
            Err(SpanValidationError::TimestampOutOfRange(_))
        ));
    }
}
