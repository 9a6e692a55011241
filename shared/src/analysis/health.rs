//! Service health classification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error rate (percent) above which a service is critical.
pub const CRITICAL_ERROR_RATE: f64 = 20.0;
/// Average latency (ms) above which a service is critical.
pub const CRITICAL_LATENCY_MS: f64 = 5000.0;
/// Error rate (percent) above which a service is degraded.
pub const DEGRADED_ERROR_RATE: f64 = 10.0;
/// Average latency (ms) above which a service is degraded.
pub const DEGRADED_LATENCY_MS: f64 = 2000.0;

/// Version reported for every service until deployments carry one.
pub const DEFAULT_SERVICE_VERSION: &str = "v1.0";

/// Health of a service over a time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Error rate and latency within normal bounds.
    Healthy,
    /// Elevated error rate or latency.
    Degraded,
    /// Error rate or latency beyond the critical thresholds.
    Critical,
}

impl HealthStatus {
    /// Classifies a service from its error rate (percent) and average
    /// latency (ms).
    ///
    /// Critical thresholds are checked before degraded ones and the first
    /// match wins.
    #[must_use]
    pub fn classify(error_rate: f64, avg_latency: f64) -> Self {
        if error_rate > CRITICAL_ERROR_RATE || avg_latency > CRITICAL_LATENCY_MS {
            Self::Critical
        } else if error_rate > DEGRADED_ERROR_RATE || avg_latency > DEGRADED_LATENCY_MS {
            Self::Degraded
        } else {
            Self::Healthy
        }
    }

    /// Returns the sort weight of this status: 1 healthy, 2 degraded,
    /// 3 critical.
    #[must_use]
    pub fn severity_score(self) -> u8 {
        match self {
            Self::Healthy => 1,
            Self::Degraded => 2,
            Self::Critical => 3,
        }
    }

    /// Returns the lowercase wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health snapshot of a single service. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// Registry id of the service, 0 when unregistered.
    pub service_id: u64,
    /// Service name.
    pub service_name: String,
    /// Deployed version.
    pub version: String,
    /// Classified status.
    pub status: HealthStatus,
    /// Numeric weight of `status`.
    pub severity_score: u8,
    /// Percentage of error logs in the window.
    pub error_rate: f64,
    /// Mean span duration in the window (ms).
    pub avg_latency: f64,
    /// Number of error logs in the window.
    pub error_count: usize,
    /// Number of logs in the window.
    pub total_logs: usize,
}

impl ServiceHealth {
    /// Builds a snapshot from aggregate figures, classifying the status.
    #[must_use]
    pub fn new(
        service_id: u64,
        service_name: impl Into<String>,
        error_rate: f64,
        avg_latency: f64,
        error_count: usize,
        total_logs: usize,
    ) -> Self {
        let status = HealthStatus::classify(error_rate, avg_latency);
        Self {
            service_id,
            service_name: service_name.into(),
            version: DEFAULT_SERVICE_VERSION.to_string(),
            status,
            severity_score: status.severity_score(),
            error_rate,
            avg_latency,
            error_count,
            total_logs,
        }
    }

    /// Returns true unless the service is healthy.
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        self.status != HealthStatus::Healthy
    }
}
