//! LLM-assisted root cause analysis.
//!
//! Every operation degrades to a default result instead of failing: a
//! missing generator, an unreachable provider, a timeout or an unparseable
//! answer all produce a low-confidence value and a log line.

use super::backend::{extract_json, GenerationError, TextGenerator, DEFAULT_TIMEOUT};
use crate::models::{Event, LogEntry, TraceSpan, SLOW_SPAN_THRESHOLD_MS};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Number of samples of each kind included in a prompt.
const SUMMARY_SAMPLES: usize = 5;

/// Root causes the model is asked to choose from.
pub const ROOT_CAUSES: [&str; 10] = [
    "deployment_failure",
    "config_error",
    "resource_exhaustion",
    "cascading_failure",
    "network_issue",
    "database_bottleneck",
    "memory_leak",
    "external_service_failure",
    "traffic_spike",
    "code_bug",
];

/// Predicted root cause of an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiPrediction {
    /// Root cause label, absent when no prediction could be made.
    pub root_cause: Option<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Explanation, or the reason no prediction was made.
    pub reasoning: String,
}

impl AiPrediction {
    /// A prediction carrying only the reason it is empty.
    #[must_use]
    pub fn unavailable(reasoning: impl Into<String>) -> Self {
        Self {
            root_cause: None,
            confidence: 0.0,
            reasoning: reasoning.into(),
        }
    }
}

/// Raw shape of the model answer for a root cause prediction.
#[derive(Debug, Deserialize)]
struct PredictionAnswer {
    #[serde(default)]
    root_cause: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Incident severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    /// Immediate action required.
    Critical,
    /// Serious but contained.
    High,
    /// Noticeable impact.
    Medium,
    /// Minor impact.
    Low,
    /// Classification failed.
    Unknown,
}

impl IncidentSeverity {
    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(other.to_string()),
        }
    }
}

/// Inputs a severity classification was based on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityFactors {
    /// Error rate in percent.
    pub error_rate: f64,
    /// Number of errors.
    pub error_count: usize,
    /// Number of affected services.
    pub affected_services: usize,
}

/// Result of an incident severity classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityClassification {
    /// Assigned severity.
    pub severity: IncidentSeverity,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Inputs, absent when classification failed.
    pub factors: Option<SeverityFactors>,
}

/// Error rate (percent) above which the heuristic reports critical.
const HEURISTIC_CRITICAL_ERROR_RATE: f64 = 30.0;
/// Error count above which the heuristic reports critical.
const HEURISTIC_CRITICAL_ERROR_COUNT: usize = 100;

/// Root cause analysis on top of an optional [`TextGenerator`].
#[derive(Clone)]
pub struct RootCauseAnalyzer {
    generator: Option<Arc<dyn TextGenerator>>,
    timeout: Duration,
}

impl fmt::Debug for RootCauseAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootCauseAnalyzer")
            .field("configured", &self.is_configured())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for RootCauseAnalyzer {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RootCauseAnalyzer {
    /// Creates an analyzer using `generator` with the given per-call timeout.
    #[must_use]
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    /// Creates an analyzer without a generator.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, DEFAULT_TIMEOUT)
    }

    /// Returns true when a generator is available.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    async fn ask(
        &self,
        generator: &dyn TextGenerator,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        match tokio::time::timeout(self.timeout, generator.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.timeout)),
        }
    }

    /// Predicts the root cause of the incident described by the samples.
    ///
    /// Never fails: every failure is reported through the `reasoning` of a
    /// zero-confidence prediction.
    pub async fn predict_root_cause(
        &self,
        error_logs: &[LogEntry],
        events: &[Event],
        slow_traces: &[TraceSpan],
    ) -> AiPrediction {
        if error_logs.is_empty() && events.is_empty() && slow_traces.is_empty() {
            return AiPrediction::unavailable("No telemetry data to analyze");
        }

        let Some(generator) = self.generator.as_deref() else {
            warn!("Root cause prediction requested but no LLM backend is configured");
            return AiPrediction::unavailable("AI service not configured");
        };

        let prompt = root_cause_prompt(&telemetry_summary(error_logs, events, slow_traces));
        let answer = match self.ask(generator, &prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "Root cause prediction failed");
                return AiPrediction::unavailable(format!("Analysis failed: {e}"));
            }
        };

        match serde_json::from_str::<PredictionAnswer>(extract_json(&answer)) {
            Ok(parsed) => {
                debug!(root_cause = ?parsed.root_cause, "Received root cause prediction");
                AiPrediction {
                    root_cause: parsed.root_cause,
                    confidence: parsed.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
                    reasoning: parsed.reasoning.unwrap_or_default(),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to parse root cause prediction");
                AiPrediction::unavailable("Failed to parse AI response")
            }
        }
    }

    /// Asks the model how strongly the signals are related, in `[0, 1]`.
    ///
    /// Returns 0 when there is nothing to score or no generator, and 0.5
    /// when the call fails or the answer is not a number.
    pub async fn score_correlation(
        &self,
        error_logs: &[LogEntry],
        events: &[Event],
        slow_traces: &[TraceSpan],
    ) -> f64 {
        if error_logs.is_empty() && events.is_empty() && slow_traces.is_empty() {
            return 0.0;
        }
        let Some(generator) = self.generator.as_deref() else {
            return 0.0;
        };

        let prompt = format!(
            "Given this incident telemetry:\n\
             - Error logs: {}\n\
             - Infrastructure events: {}\n\
             - Slow traces: {}\n\n\
             Rate the correlation strength between these signals on a scale of 0-1, where:\n\
             0 = no correlation (independent issues)\n\
             1 = strong correlation (clearly related incident)\n\n\
             Respond with ONLY a single decimal number between 0 and 1.",
            error_logs.len(),
            events.len(),
            slow_traces.len()
        );

        let answer = match self.ask(generator, &prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                error!(error = %e, "Correlation scoring failed");
                return 0.5;
            }
        };

        match answer.trim().parse::<f64>() {
            Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
            _ => {
                error!(answer = %answer.trim(), "Correlation score is not a number");
                0.5
            }
        }
    }

    /// Classifies the severity of an incident.
    ///
    /// Without a generator a fixed heuristic is used. Failed or unrecognised
    /// model answers yield [`IncidentSeverity::Unknown`] with zero confidence.
    pub async fn classify_incident_severity(
        &self,
        error_rate: f64,
        error_count: usize,
        affected_services: usize,
    ) -> SeverityClassification {
        let factors = SeverityFactors {
            error_rate,
            error_count,
            affected_services,
        };

        let Some(generator) = self.generator.as_deref() else {
            let critical = error_rate > HEURISTIC_CRITICAL_ERROR_RATE
                || error_count > HEURISTIC_CRITICAL_ERROR_COUNT;
            return SeverityClassification {
                severity: if critical {
                    IncidentSeverity::Critical
                } else {
                    IncidentSeverity::Medium
                },
                confidence: if critical { 0.7 } else { 0.5 },
                factors: Some(factors),
            };
        };

        let prompt = format!(
            "Classify the severity of an incident with these metrics:\n\
             - Error rate: {error_rate}%\n\
             - Error count: {error_count}\n\
             - Affected services: {affected_services}\n\n\
             Classify as: critical, high, medium, or low\n\n\
             Respond with ONLY the severity level."
        );

        let severity = self
            .ask(generator, &prompt)
            .await
            .map_err(|e| e.to_string())
            .and_then(|answer| answer.parse::<IncidentSeverity>());

        match severity {
            Ok(severity) => SeverityClassification {
                severity,
                confidence: 0.85,
                factors: Some(factors),
            },
            Err(e) => {
                error!(error = %e, "Incident severity classification failed");
                SeverityClassification {
                    severity: IncidentSeverity::Unknown,
                    confidence: 0.0,
                    factors: None,
                }
            }
        }
    }
}

fn root_cause_prompt(summary: &str) -> String {
    format!(
        "Analyze the following incident telemetry data and predict the root cause.\n\n\
         TELEMETRY DATA:\n{summary}\n\
         Based on this data, provide a JSON response with:\n\
         1. root_cause: the predicted root cause (one of: {})\n\
         2. confidence: confidence score between 0 and 1\n\
         3. reasoning: brief explanation for the prediction\n\n\
         Respond ONLY with valid JSON, no markdown formatting.",
        ROOT_CAUSES.join(", ")
    )
}

fn push_remainder(out: &mut String, total: usize) {
    if total > SUMMARY_SAMPLES {
        let _ = writeln!(out, "  ... and {} more", total - SUMMARY_SAMPLES);
    }
}

/// Renders the first few samples of each kind as prompt text.
pub(crate) fn telemetry_summary(
    error_logs: &[LogEntry],
    events: &[Event],
    slow_traces: &[TraceSpan],
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Error Logs ({} total):", error_logs.len());
    for log in error_logs.iter().take(SUMMARY_SAMPLES) {
        let _ = writeln!(out, "  - [{}] {}", log.level, log.message);
    }
    push_remainder(&mut out, error_logs.len());

    let _ = writeln!(out, "\nEvents ({} total):", events.len());
    for event in events.iter().take(SUMMARY_SAMPLES) {
        let _ = writeln!(
            out,
            "  - [{}] {} (severity: {})",
            event.event_type, event.details, event.severity
        );
    }
    push_remainder(&mut out, events.len());

    let _ = writeln!(
        out,
        "\nSlow Traces ({} total, >{SLOW_SPAN_THRESHOLD_MS}ms):",
        slow_traces.len()
    );
    for span in slow_traces.iter().take(SUMMARY_SAMPLES) {
        let _ = writeln!(out, "  - {} - {}ms", span.operation, span.duration_ms);
    }
    push_remainder(&mut out, slow_traces.len());

    out
}
