//! Metric data model.
//!
//! A `MetricPoint` is one sample of a named time series for a service. The
//! metric name space is open: any non-empty name is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// A single metric sample.
///
/// # Example
///
/// ```
/// use shared::models::MetricPoint;
///
/// let point = MetricPoint::new("checkout", "cpu_usage", 72.5).with_unit("%");
///
/// assert!(point.validate_metric().is_ok());
/// assert_eq!(point.unit.as_deref(), Some("%"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MetricPoint {
    /// Name of the service that reported the sample.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// Name of the metric (e.g. `cpu_usage`, `request_rate`).
    #[validate(length(min = 1, message = "Metric name cannot be empty"))]
    pub metric_name: String,

    /// The sampled value.
    pub value: f64,

    /// Optional unit of the value (e.g. "ms", "requests/s", "%").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Timestamp of the sample.
    pub timestamp: DateTime<Utc>,
}

/// Errors that can occur during metric validation.
#[derive(Debug, Error)]
pub enum MetricValidationError {
    /// The service name is empty.
    #[error("Service name cannot be empty")]
    EmptyService,

    /// The metric name is empty.
    #[error("Metric name cannot be empty")]
    EmptyName,

    /// The value is NaN or infinite.
    #[error("Metric value must be a finite number")]
    NonFiniteValue,

    /// The timestamp cannot be stored as nanoseconds since the epoch.
    #[error("Timestamp {0} is outside the storable range (1677-09-21 to 2262-04-11)")]
    TimestampOutOfRange(DateTime<Utc>),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl MetricPoint {
    /// Creates a new metric sample with the current timestamp.
    #[must_use]
    pub fn new(service: impl Into<String>, metric_name: impl Into<String>, value: f64) -> Self {
        Self {
            service: service.into(),
            metric_name: metric_name.into(),
            value,
            unit: None,
            timestamp: Utc::now(),
        }
    }

    /// Sets the unit of the sample.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the timestamp of the sample.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Validates the metric sample.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The service or metric name is empty
    /// - The value is not finite
    pub fn validate_metric(&self) -> Result<(), MetricValidationError> {
        if self.service.is_empty() {
            return Err(MetricValidationError::EmptyService);
        }
        if self.metric_name.is_empty() {
            return Err(MetricValidationError::EmptyName);
        }
        if !self.value.is_finite() {
            return Err(MetricValidationError::NonFiniteValue);
        }
        if !super::storable_timestamp(self.timestamp) {
            return Err(MetricValidationError::TimestampOutOfRange(self.timestamp));
        }
        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_point_new() {
        let point = MetricPoint::new("api", "request_rate", 120.0);

        assert_eq!(point.service, "api");
        assert_eq!(point.metric_name, "request_rate");
        assert!((point.value - 120.0).abs() < f64::EPSILON);
        assert!(point.unit.is_none());
    }

    #[test]
    fn test_metric_point_deserialization() {
        let json = r#"{
            "service": "db",
            "metric_name": "connections",
            "value": 42,
            "unit": "count",
            "timestamp": "2024-01-15T10:30:00Z"
        }"#;

        let point: MetricPoint = serde_json::from_str(json).unwrap();

        assert_eq!(point.metric_name, "connections");
        assert_eq!(point.unit.as_deref(), Some("count"));
        assert!((point.value - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_validation_empty_name() {
        let point = MetricPoint::new("api", "", 1.0);
        assert!(matches!(
            point.validate_metric(),
            Err(MetricValidationError::EmptyName)
        ));
    }

    #[test]
    fn test_metric_validation_non_finite() {
        let point = MetricPoint::new("api", "latency", f64::NAN);
        assert!(matches!(
            point.validate_metric(),
            Err(MetricValidationError::NonFiniteValue)
        ));
    }

    #[test]
    fn test_metric_validation_rejects_unstorable_timestamp() {
        let ancient = DateTime::parse_from_rfc3339("1600-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let point = MetricPoint::new("api", "cpu_usage", 1.0).with_timestamp(ancient);

        assert!(matches!(
            point.validate_metric(),
            Err(MetricValidationError::TimestampOutOfRange(_))
        ));
    }
}
