//! Telemetry data models.
//!
//! The four append-only row kinds the analysis layer reads: logs, metrics,
//! trace spans and events. All of them are keyed by service name and
//! timestamp.

pub mod event;
pub mod log;
pub mod metric;
pub mod trace;

use chrono::{DateTime, Utc};

pub use event::{Event, EventSeverity, EventValidationError, KNOWN_EVENT_TYPES};
pub use log::{LogEntry, LogLevel, LogValidationError};
pub use metric::{MetricPoint, MetricValidationError};
pub use trace::{SpanValidationError, TraceSpan, SLOW_SPAN_THRESHOLD_MS};

/// Returns true if `ts` fits the signed 64-bit nanosecond column every
/// telemetry table stores timestamps in (1677-09-21 to 2262-04-11 UTC).
pub(crate) fn storable_timestamp(ts: DateTime<Utc>) -> bool {
    ts.timestamp_nanos_opt().is_some()
}
