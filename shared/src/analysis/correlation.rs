//! Time-window correlation of error logs with events and slow spans.
//!
//! The window is anchored on the error logs themselves: it starts at the
//! earliest error and ends [`CORRELATION_WINDOW_SECS`] after the latest one.
//! Both ends are inclusive.

use super::round2;
use crate::models::{Event, LogEntry, TraceSpan};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How far past the last error log events and spans still count.
pub const CORRELATION_WINDOW_SECS: i64 = 300;

/// Maximum number of sample events attached to an event correlation.
const SAMPLE_EVENTS: usize = 5;

/// Event reference attached to an event/error correlation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedEvent {
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event time.
    pub timestamp: DateTime<Utc>,
}

/// A co-occurrence between error logs and another telemetry kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Correlation {
    /// Events recorded around the error burst.
    #[serde(rename = "event_error_correlation")]
    EventError {
        /// Number of error logs.
        error_count: usize,
        /// Number of events inside the window.
        event_count: usize,
        /// `event_count / error_count`, capped at 1.
        confidence: f64,
        /// Up to five of the matching events.
        events: Vec<CorrelatedEvent>,
    },
    /// Slow spans recorded around the error burst.
    #[serde(rename = "latency_error_correlation")]
    LatencyError {
        /// Number of error logs.
        error_count: usize,
        /// Number of slow spans inside the window.
        slow_trace_count: usize,
        /// Mean duration of those spans (ms).
        avg_slow_duration: f64,
        /// `slow_trace_count / error_count`, capped at 1.
        confidence: f64,
    },
}

impl Correlation {
    /// Returns the confidence of this correlation.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        match self {
            Self::EventError { confidence, .. } | Self::LatencyError { confidence, .. } => {
                *confidence
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ErrorWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl ErrorWindow {
    fn from_logs(error_logs: &[LogEntry]) -> Option<Self> {
        let first = error_logs.iter().map(|log| log.timestamp).min()?;
        let last = error_logs.iter().map(|log| log.timestamp).max()?;
        Some(Self {
            start: first,
            end: last + Duration::seconds(CORRELATION_WINDOW_SECS),
        })
    }

    fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (matched as f64 / total as f64).clamp(0.0, 1.0)
}

/// Correlates error logs with events and slow spans.
///
/// `slow_traces` is expected to be pre-filtered to slow spans. Returns an
/// empty list when there are no error logs; otherwise at most one record per
/// kind, emitted only when something fell inside the window.
#[must_use]
pub fn correlate(
    error_logs: &[LogEntry],
    events: &[Event],
    slow_traces: &[TraceSpan],
) -> Vec<Correlation> {
    let Some(window) = ErrorWindow::from_logs(error_logs) else {
        return Vec::new();
    };
    let error_count = error_logs.len();
    let mut correlations = Vec::new();

    let matched_events: Vec<&Event> = events
        .iter()
        .filter(|event| window.contains(event.timestamp))
        .collect();
    if !matched_events.is_empty() {
        correlations.push(Correlation::EventError {
            error_count,
            event_count: matched_events.len(),
            confidence: ratio(matched_events.len(), error_count),
            events: matched_events
                .iter()
                .take(SAMPLE_EVENTS)
                .map(|event| CorrelatedEvent {
                    event_type: event.event_type.clone(),
                    timestamp: event.timestamp,
                })
                .collect(),
        });
    }

    let matched_spans: Vec<&TraceSpan> = slow_traces
        .iter()
        .filter(|span| window.contains(span.timestamp))
        .collect();
    if !matched_spans.is_empty() {
        #[allow(clippy::cast_precision_loss)]
        let avg = matched_spans.iter().map(|s| s.duration_ms).sum::<f64>()
            / matched_spans.len() as f64;
        correlations.push(Correlation::LatencyError {
            error_count,
            slow_trace_count: matched_spans.len(),
            avg_slow_duration: round2(avg),
            confidence: ratio(matched_spans.len(), error_count),
        });
    }

    correlations
}
