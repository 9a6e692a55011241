//! Dashboard aggregation.
//!
//! [`DashboardService`] combines the telemetry stores, the analysis functions
//! and the root cause analyzer into the views served to operators. Every
//! windowed operation covers `[now - hours, now)`; the `_at` variants take
//! `now` explicitly.

use crate::ai::{AiPrediction, RootCauseAnalyzer, SeverityClassification};
use crate::analysis::{
    correlate, event_statistics, latency_statistics, log_statistics, metric_statistics,
    Correlation, EventStatistics, HealthStatus, LatencyStatistics, LogStatistics,
    MetricStatistics, ServiceHealth,
};
use crate::models::{Event, LogEntry, LogLevel, TraceSpan, SLOW_SPAN_THRESHOLD_MS};
use crate::storage::{
    EventQuery, EventStoreError, LogQuery, LogStoreError, MetricQuery, MetricStoreError,
    RegistryError, TelemetryStores, TraceQuery, TraceStoreError,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, error, instrument};

/// Label used for unfiltered analyses.
pub const ALL_SERVICES: &str = "all";

/// Errors returned by dashboard operations.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Log store failure.
    #[error(transparent)]
    Logs(#[from] LogStoreError),

    /// Metric store failure.
    #[error(transparent)]
    Metrics(#[from] MetricStoreError),

    /// Trace store failure.
    #[error(transparent)]
    Traces(#[from] TraceStoreError),

    /// Event store failure.
    #[error(transparent)]
    Events(#[from] EventStoreError),

    /// Service registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Fleet-wide summary for a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardOverview {
    /// When the overview was computed.
    pub timestamp: DateTime<Utc>,
    /// Window length in hours.
    pub time_range_hours: u32,
    /// Number of known services.
    pub total_services: usize,
    /// Services classified healthy.
    pub healthy_services: usize,
    /// Services classified degraded.
    pub degraded_services: usize,
    /// Services classified critical.
    pub critical_services: usize,
    /// Logs recorded in the window.
    pub total_logs: usize,
    /// Events recorded in the window.
    pub total_events: usize,
    /// Spans recorded in the window.
    pub total_traces: usize,
    /// Health of every service.
    pub service_health: Vec<ServiceHealth>,
}

/// Result of correlating errors, events and slow spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationAnalysis {
    /// Analysed service, or `"all"`.
    pub service_name: String,
    /// Window length in hours.
    pub time_range_hours: u32,
    /// Error logs in the window.
    pub error_logs_count: usize,
    /// Events in the window.
    pub events_count: usize,
    /// Slow spans in the window.
    pub slow_traces_count: usize,
    /// Detected co-occurrences.
    pub correlations: Vec<Correlation>,
    /// Model root cause guess.
    pub ai_prediction: AiPrediction,
    /// Model correlation strength in `[0, 1]`.
    pub correlation_score: f64,
}

/// Number of events in one hourly bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumePoint {
    /// Bucket start, formatted `%Y-%m-%d %H:00:00`.
    pub timestamp: String,
    /// Events in the bucket.
    pub incident_count: usize,
}

/// Hourly event volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentVolume {
    /// Analysed service, or `"all"`.
    pub service_name: String,
    /// Window length in hours.
    pub time_range_hours: u32,
    /// Non-empty buckets, oldest first.
    pub data_points: Vec<VolumePoint>,
}

/// Dashboard views over the telemetry stores.
#[derive(Debug, Clone)]
pub struct DashboardService {
    stores: TelemetryStores,
    analyzer: RootCauseAnalyzer,
}

fn window_start(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
    now - Duration::hours(i64::from(hours))
}

fn logged<T>(
    operation: &'static str,
    result: Result<T, DashboardError>,
) -> Result<T, DashboardError> {
    result.inspect_err(|e| error!(operation, error = %e, "Dashboard query failed"))
}

impl DashboardService {
    /// Creates a service over `stores` using `analyzer` for AI features.
    #[must_use]
    pub fn new(stores: TelemetryStores, analyzer: RootCauseAnalyzer) -> Self {
        Self { stores, analyzer }
    }

    /// Returns the underlying stores.
    #[must_use]
    pub fn stores(&self) -> &TelemetryStores {
        &self.stores
    }

    /// Returns the root cause analyzer.
    #[must_use]
    pub fn analyzer(&self) -> &RootCauseAnalyzer {
        &self.analyzer
    }

    /// Sorted union of the service names seen in any store.
    ///
    /// # Errors
    ///
    /// Returns an error if any store fails.
    pub fn service_list(&self) -> Result<Vec<String>, DashboardError> {
        logged("service_list", self.collect_services())
    }

    fn collect_services(&self) -> Result<Vec<String>, DashboardError> {
        let mut names = BTreeSet::new();
        names.extend(self.stores.logs.services()?);
        names.extend(self.stores.metrics.services()?);
        names.extend(self.stores.traces.services()?);
        names.extend(self.stores.events.services()?);
        Ok(names.into_iter().collect())
    }

    /// Log statistics for the logs matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log store fails.
    pub fn log_statistics(&self, query: LogQuery) -> Result<LogStatistics, DashboardError> {
        logged(
            "log_statistics",
            self.stores
                .logs
                .query(query)
                .map(|result| log_statistics(&result.logs))
                .map_err(DashboardError::from),
        )
    }

    /// Latency statistics for the spans matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the trace store fails.
    pub fn latency_statistics(
        &self,
        query: TraceQuery,
    ) -> Result<LatencyStatistics, DashboardError> {
        logged(
            "latency_statistics",
            self.stores
                .traces
                .query(query)
                .map(|result| {
                    let durations: Vec<f64> =
                        result.spans.iter().map(|span| span.duration_ms).collect();
                    latency_statistics(&durations)
                })
                .map_err(DashboardError::from),
        )
    }

    /// Statistics of the metric samples matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metric store fails.
    pub fn metric_statistics(
        &self,
        query: MetricQuery,
    ) -> Result<MetricStatistics, DashboardError> {
        logged(
            "metric_statistics",
            self.stores
                .metrics
                .query(query)
                .map(|result| {
                    let values: Vec<f64> = result.metrics.iter().map(|m| m.value).collect();
                    metric_statistics(&values)
                })
                .map_err(DashboardError::from),
        )
    }

    /// Event statistics for the events matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event store fails.
    pub fn event_statistics(&self, query: EventQuery) -> Result<EventStatistics, DashboardError> {
        logged(
            "event_statistics",
            self.stores
                .events
                .query(query)
                .map(|result| event_statistics(&result.events))
                .map_err(DashboardError::from),
        )
    }

    /// Health of one service over the last `hours`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn service_health(
        &self,
        service: &str,
        hours: u32,
    ) -> Result<ServiceHealth, DashboardError> {
        self.service_health_at(service, hours, Utc::now())
    }

    /// Health of one service over the `hours` before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn service_health_at(
        &self,
        service: &str,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<ServiceHealth, DashboardError> {
        logged("service_health", self.compute_health(service, hours, now))
    }

    fn compute_health(
        &self,
        service: &str,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<ServiceHealth, DashboardError> {
        let start = window_start(now, hours);
        let service_id = self.stores.registry.service_id(service)?.unwrap_or(0);

        let logs = self.stores.logs.query(
            LogQuery::new()
                .with_service(service)
                .with_start_time(start)
                .with_end_time(now),
        )?;
        let log_stats = log_statistics(&logs.logs);

        let spans = self.stores.traces.query(
            TraceQuery::new()
                .with_service(service)
                .with_start_time(start)
                .with_end_time(now),
        )?;
        let durations: Vec<f64> = spans.spans.iter().map(|span| span.duration_ms).collect();
        let latency = latency_statistics(&durations);

        let health = ServiceHealth::new(
            service_id,
            service,
            log_stats.error_rate,
            latency.avg,
            log_stats.error_count,
            log_stats.total_logs,
        );
        debug!(service, status = %health.status, "Computed service health");
        Ok(health)
    }

    /// Health of every known service over the last `hours`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn services_health(&self, hours: u32) -> Result<Vec<ServiceHealth>, DashboardError> {
        self.services_health_at(hours, Utc::now())
    }

    /// Health of every known service over the `hours` before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn services_health_at(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<ServiceHealth>, DashboardError> {
        logged("services_health", self.all_health(hours, now))
    }

    fn all_health(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<ServiceHealth>, DashboardError> {
        self.collect_services()?
            .iter()
            .map(|service| self.compute_health(service, hours, now))
            .collect()
    }

    /// Degraded and critical services, worst first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn critical_services(
        &self,
        hours: u32,
        limit: usize,
    ) -> Result<Vec<ServiceHealth>, DashboardError> {
        self.critical_services_at(hours, limit, Utc::now())
    }

    /// Degraded and critical services over the `hours` before `now`.
    ///
    /// Ordered by severity score, then error rate, both descending.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn critical_services_at(
        &self,
        hours: u32,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<ServiceHealth>, DashboardError> {
        let mut services = logged("critical_services", self.all_health(hours, now))?;
        services.retain(ServiceHealth::needs_attention);
        services.sort_by(|a, b| {
            b.severity_score
                .cmp(&a.severity_score)
                .then_with(|| b.error_rate.total_cmp(&a.error_rate))
        });
        services.truncate(limit);
        Ok(services)
    }

    /// Fleet overview for the last `hours`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn overview(&self, hours: u32) -> Result<DashboardOverview, DashboardError> {
        self.overview_at(hours, Utc::now())
    }

    /// Fleet overview for the `hours` before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub fn overview_at(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<DashboardOverview, DashboardError> {
        logged("overview", self.compute_overview(hours, now))
    }

    fn compute_overview(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<DashboardOverview, DashboardError> {
        let start = window_start(now, hours);
        let service_health = self.all_health(hours, now)?;
        let count_status = |status: HealthStatus| {
            service_health.iter().filter(|h| h.status == status).count()
        };

        let total_logs = self
            .stores
            .logs
            .query(LogQuery::new().with_start_time(start).with_end_time(now).with_limit(0))?
            .total_count;
        let total_events = self
            .stores
            .events
            .query(EventQuery::new().with_start_time(start).with_end_time(now).with_limit(0))?
            .total_count;
        let total_traces = self
            .stores
            .traces
            .query(TraceQuery::new().with_start_time(start).with_end_time(now).with_limit(0))?
            .total_count;

        Ok(DashboardOverview {
            timestamp: now,
            time_range_hours: hours,
            total_services: service_health.len(),
            healthy_services: count_status(HealthStatus::Healthy),
            degraded_services: count_status(HealthStatus::Degraded),
            critical_services: count_status(HealthStatus::Critical),
            total_logs,
            total_events,
            total_traces,
            service_health,
        })
    }

    /// Hourly event counts for the last `hours`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event store fails.
    pub fn incident_volume(
        &self,
        service: Option<&str>,
        hours: u32,
    ) -> Result<IncidentVolume, DashboardError> {
        self.incident_volume_at(service, hours, Utc::now())
    }

    /// Hourly event counts for the `hours` before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event store fails.
    pub fn incident_volume_at(
        &self,
        service: Option<&str>,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<IncidentVolume, DashboardError> {
        let events = logged(
            "incident_volume",
            self.stores
                .events
                .query(
                    EventQuery::new()
                        .with_service_opt(service)
                        .with_start_time(window_start(now, hours))
                        .with_end_time(now),
                )
                .map_err(DashboardError::from),
        )?;

        let mut buckets: BTreeMap<String, usize> = BTreeMap::new();
        for event in &events.events {
            *buckets
                .entry(event.timestamp.format("%Y-%m-%d %H:00:00").to_string())
                .or_default() += 1;
        }

        Ok(IncidentVolume {
            service_name: service.unwrap_or(ALL_SERVICES).to_string(),
            time_range_hours: hours,
            data_points: buckets
                .into_iter()
                .map(|(timestamp, incident_count)| VolumePoint {
                    timestamp,
                    incident_count,
                })
                .collect(),
        })
    }

    /// Correlates error logs, events and slow spans of the last `hours` and
    /// asks the analyzer for a root cause.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails. Analyzer failures only lower the
    /// confidence of the result.
    pub async fn correlation_analysis(
        &self,
        service: Option<&str>,
        hours: u32,
    ) -> Result<CorrelationAnalysis, DashboardError> {
        self.correlation_analysis_at(service, hours, Utc::now()).await
    }

    /// Correlation analysis for the `hours` before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    #[instrument(skip(self, now))]
    pub async fn correlation_analysis_at(
        &self,
        service: Option<&str>,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<CorrelationAnalysis, DashboardError> {
        let start = window_start(now, hours);

        let (error_logs, events, slow_traces) = logged(
            "correlation_analysis",
            self.correlation_inputs(service, start, now),
        )?;

        let correlations = correlate(&error_logs, &events, &slow_traces);
        let (ai_prediction, correlation_score) = tokio::join!(
            self.analyzer
                .predict_root_cause(&error_logs, &events, &slow_traces),
            self.analyzer
                .score_correlation(&error_logs, &events, &slow_traces),
        );

        debug!(
            correlations = correlations.len(),
            correlation_score, "Correlation analysis complete"
        );

        Ok(CorrelationAnalysis {
            service_name: service.unwrap_or(ALL_SERVICES).to_string(),
            time_range_hours: hours,
            error_logs_count: error_logs.len(),
            events_count: events.len(),
            slow_traces_count: slow_traces.len(),
            correlations,
            ai_prediction,
            correlation_score,
        })
    }

    /// Severity of the current incident picture over the last `hours`.
    ///
    /// Uses the fleet error rate, error count and the number of unhealthy
    /// services as inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub async fn incident_severity(
        &self,
        hours: u32,
    ) -> Result<SeverityClassification, DashboardError> {
        self.incident_severity_at(hours, Utc::now()).await
    }

    /// Incident severity over the `hours` before `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub async fn incident_severity_at(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<SeverityClassification, DashboardError> {
        let (stats, affected) = logged("incident_severity", self.severity_inputs(hours, now))?;

        Ok(self
            .analyzer
            .classify_incident_severity(stats.error_rate, stats.error_count, affected)
            .await)
    }

    fn correlation_inputs(
        &self,
        service: Option<&str>,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(Vec<LogEntry>, Vec<Event>, Vec<TraceSpan>), DashboardError> {
        let error_logs = self.stores.logs.query(
            LogQuery::new()
                .with_service_opt(service)
                .with_level(LogLevel::Error)
                .with_start_time(start)
                .with_end_time(now),
        )?;
        let events = self.stores.events.query(
            EventQuery::new()
                .with_service_opt(service)
                .with_start_time(start)
                .with_end_time(now),
        )?;
        let slow_traces = self.stores.traces.query(
            TraceQuery::new()
                .with_service_opt(service)
                .with_min_duration_ms(SLOW_SPAN_THRESHOLD_MS)
                .with_start_time(start)
                .with_end_time(now),
        )?;
        Ok((error_logs.logs, events.events, slow_traces.spans))
    }

    fn severity_inputs(
        &self,
        hours: u32,
        now: DateTime<Utc>,
    ) -> Result<(LogStatistics, usize), DashboardError> {
        let logs = self.stores.logs.query(
            LogQuery::new()
                .with_start_time(window_start(now, hours))
                .with_end_time(now),
        )?;
        let affected = self
            .all_health(hours, now)?
            .iter()
            .filter(|h| h.needs_attention())
            .count();
        Ok((log_statistics(&logs.logs), affected))
    }
}
