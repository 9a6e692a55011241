//! Aggregate statistics over telemetry slices.
//!
//! Every function accepts an empty slice and returns zero-valued aggregates
//! in that case.

use super::round2;
use crate::models::{Event, EventSeverity, LogEntry, LogLevel, KNOWN_EVENT_TYPES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts of log entries per level plus the error rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LogStatistics {
    /// Number of entries considered.
    pub total_logs: usize,
    /// Number of `ERROR` entries.
    pub error_count: usize,
    /// Number of `WARN` entries.
    pub warning_count: usize,
    /// Number of `INFO` entries.
    pub info_count: usize,
    /// Number of `DEBUG` entries.
    pub debug_count: usize,
    /// Percentage of error entries, rounded to two decimals.
    pub error_rate: f64,
}

/// Summary of span durations in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStatistics {
    /// Number of samples.
    pub count: usize,
    /// Mean duration.
    #[serde(rename = "avg_latency")]
    pub avg: f64,
    /// Median duration.
    #[serde(rename = "p50_latency")]
    pub p50: f64,
    /// 95th percentile duration.
    #[serde(rename = "p95_latency")]
    pub p95: f64,
    /// 99th percentile duration.
    #[serde(rename = "p99_latency")]
    pub p99: f64,
    /// Longest duration.
    #[serde(rename = "max_latency")]
    pub max: f64,
    /// Shortest duration.
    #[serde(rename = "min_latency")]
    pub min: f64,
}

/// Summary of the values of a single metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    /// Number of samples.
    pub count: usize,
    /// Mean value.
    pub avg: f64,
    /// Largest value.
    pub max: f64,
    /// Smallest value.
    pub min: f64,
    /// Sample standard deviation, 0 with fewer than two samples.
    pub stddev: f64,
}

/// Event counts grouped by type and severity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventStatistics {
    /// Number of events considered.
    pub total_events: usize,
    /// Counts per well-known event type.
    pub by_type: BTreeMap<String, usize>,
    /// Counts per severity.
    pub by_severity: BTreeMap<String, usize>,
}

/// Computes per-level counts and the error rate of a set of log entries.
#[must_use]
pub fn log_statistics(logs: &[LogEntry]) -> LogStatistics {
    let mut stats = LogStatistics {
        total_logs: logs.len(),
        ..LogStatistics::default()
    };

    for log in logs {
        match log.level {
            LogLevel::Error => stats.error_count += 1,
            LogLevel::Warn => stats.warning_count += 1,
            LogLevel::Info => stats.info_count += 1,
            LogLevel::Debug => stats.debug_count += 1,
        }
    }

    if stats.total_logs > 0 {
        #[allow(clippy::cast_precision_loss)]
        let rate = stats.error_count as f64 / stats.total_logs as f64 * 100.0;
        stats.error_rate = round2(rate);
    }

    stats
}

/// Returns the `p`th percentile (0-100) of an ascending slice.
///
/// Uses linear interpolation between the two closest ranks, so the result
/// always lies within `[sorted[0], sorted[n - 1]]`. Returns 0 for an empty
/// slice.
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            #[allow(clippy::cast_precision_loss)]
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            #[allow(clippy::cast_precision_loss)]
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Computes mean, percentiles and extremes of span durations.
#[must_use]
pub fn latency_statistics(durations: &[f64]) -> LatencyStatistics {
    if durations.is_empty() {
        return LatencyStatistics::default();
    }

    let mut sorted = durations.to_vec();
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();

    #[allow(clippy::cast_precision_loss)]
    let avg = sorted.iter().sum::<f64>() / count as f64;

    LatencyStatistics {
        count,
        avg: round2(avg),
        p50: round2(percentile(&sorted, 50.0)),
        p95: round2(percentile(&sorted, 95.0)),
        p99: round2(percentile(&sorted, 99.0)),
        max: round2(sorted[count - 1]),
        min: round2(sorted[0]),
    }
}

/// Computes mean, extremes and sample standard deviation of metric values.
#[must_use]
pub fn metric_statistics(values: &[f64]) -> MetricStatistics {
    if values.is_empty() {
        return MetricStatistics::default();
    }

    let count = values.len();
    #[allow(clippy::cast_precision_loss)]
    let n = count as f64;
    let avg = values.iter().sum::<f64>() / n;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);

    let stddev = if count < 2 {
        0.0
    } else {
        let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    };

    MetricStatistics {
        count,
        avg: round2(avg),
        max: round2(max),
        min: round2(min),
        stddev: round2(stddev),
    }
}

/// Counts events by well-known type and by severity.
///
/// Every well-known type and every severity is present in the result, with
/// zero when no event matched. Events of other types only contribute to
/// `total_events`.
#[must_use]
pub fn event_statistics(events: &[Event]) -> EventStatistics {
    let mut by_type: BTreeMap<String, usize> = KNOWN_EVENT_TYPES
        .iter()
        .map(|t| ((*t).to_string(), 0))
        .collect();
    let mut by_severity: BTreeMap<String, usize> = EventSeverity::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), 0))
        .collect();

    for event in events {
        if let Some(count) = by_type.get_mut(event.event_type.as_str()) {
            *count += 1;
        }
        if let Some(count) = by_severity.get_mut(event.severity.as_str()) {
            *count += 1;
        }
    }

    EventStatistics {
        total_events: events.len(),
        by_type,
        by_severity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logs(levels: &[LogLevel]) -> Vec<LogEntry> {
        levels
            .iter()
            .map(|level| LogEntry::new("api", *level, "msg"))
            .collect()
    }

    #[test]
    fn test_log_statistics_empty() {
        let stats = log_statistics(&[]);
        assert_eq!(stats.total_logs, 0);
        assert!(stats.error_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_statistics_error_rate() {
        let stats = log_statistics(&logs(&[
            LogLevel::Error,
            LogLevel::Error,
            LogLevel::Info,
            LogLevel::Debug,
        ]));

        assert_eq!(stats.total_logs, 4);
        assert_eq!(stats.error_count, 2);
        assert_eq!(stats.info_count, 1);
        assert_eq!(stats.debug_count, 1);
        assert_eq!(stats.warning_count, 0);
        assert!((stats.error_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_log_statistics_rounds_rate() {
        let stats = log_statistics(&logs(&[LogLevel::Error, LogLevel::Info, LogLevel::Warn]));
        assert!((stats.error_rate - 33.33).abs() < f64::EPSILON);
    }

    #[test]
    fn test_latency_statistics_empty() {
        assert_eq!(latency_statistics(&[]), LatencyStatistics::default());
    }

    #[test]
    fn test_latency_statistics_ten_samples() {
        let durations: Vec<f64> = (1..=10).map(|i| f64::from(i) * 100.0).collect();
        let stats = latency_statistics(&durations);

        assert_eq!(stats.count, 10);
        assert!((stats.min - 100.0).abs() < f64::EPSILON);
        assert!((stats.max - 1000.0).abs() < f64::EPSILON);
        assert!((stats.avg - 550.0).abs() < f64::EPSILON);
        assert!((stats.p50 - 550.0).abs() < f64::EPSILON);
        assert!(stats.min <= stats.p50);
        assert!(stats.p50 <= stats.p95);
        assert!(stats.p95 <= stats.p99);
        assert!(stats.p99 <= stats.max);
    }

    #[test]
    fn test_latency_statistics_unsorted_input() {
        let stats = latency_statistics(&[900.0, 100.0, 500.0]);
        assert!((stats.min - 100.0).abs() < f64::EPSILON);
        assert!((stats.max - 900.0).abs() < f64::EPSILON);
        assert!((stats.p50 - 500.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentile_single_sample() {
        assert!((percentile(&[42.0], 99.0) - 42.0).abs() < f64::EPSILON);
        assert!(percentile(&[], 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [10.0, 20.0, 30.0, 40.0];
        assert!((percentile(&sorted, 50.0) - 25.0).abs() < f64::EPSILON);
        assert!((percentile(&sorted, 0.0) - 10.0).abs() < f64::EPSILON);
        assert!((percentile(&sorted, 100.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_statistics() {
        let stats = metric_statistics(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);

        assert_eq!(stats.count, 8);
        assert!((stats.avg - 5.0).abs() < f64::EPSILON);
        assert!((stats.max - 9.0).abs() < f64::EPSILON);
        assert!((stats.min - 2.0).abs() < f64::EPSILON);
        assert!((stats.stddev - 2.14).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metric_statistics_single_sample_has_zero_stddev() {
        let stats = metric_statistics(&[3.5]);
        assert_eq!(stats.count, 1);
        assert!(stats.stddev.abs() < f64::EPSILON);
    }

    #[test]
    fn test_event_statistics_has_all_keys() {
        let stats = event_statistics(&[]);

        assert_eq!(stats.total_events, 0);
        assert_eq!(stats.by_type.len(), 4);
        assert_eq!(stats.by_severity.len(), 3);
        assert!(stats.by_type.values().all(|c| *c == 0));
    }

    #[test]
    fn test_event_statistics_counts() {
        let events = vec![
            Event::new("api", "deployment", "v2").with_severity(EventSeverity::Warning),
            Event::new("api", "deployment", "v3").with_severity(EventSeverity::Critical),
            Event::new("api", "feature_flag", "x"),
        ];
        let stats = event_statistics(&events);

        assert_eq!(stats.total_events, 3);
        assert_eq!(stats.by_type["deployment"], 2);
        assert_eq!(stats.by_type["restart"], 0);
        assert!(!stats.by_type.contains_key("feature_flag"));
        assert_eq!(stats.by_severity["critical"], 1);
        assert_eq!(stats.by_severity["warning"], 1);
        assert_eq!(stats.by_severity["info"], 1);
    }
}
