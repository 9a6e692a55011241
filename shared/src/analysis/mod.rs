//! Telemetry analysis.
//!
//! Pure computations over already-filtered telemetry:
//!
//! - [`stats`] - aggregate statistics per telemetry kind
//! - [`health`] - threshold-based service health classification
//! - [`correlation`] - time-window overlap between errors, events and slow spans

pub mod correlation;
pub mod health;
pub mod stats;

pub use correlation::{correlate, Correlation, CorrelatedEvent, CORRELATION_WINDOW_SECS};
pub use health::{HealthStatus, ServiceHealth};
pub use stats::{
    event_statistics, latency_statistics, log_statistics, metric_statistics, percentile,
    EventStatistics, LatencyStatistics, LogStatistics, MetricStatistics,
};

/// Rounds a value to two decimal places.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
