//! Log data model.
//!
//! Defines the `LogEntry` row as it is stored in the `logs` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Log severity level.
///
/// The level set is fixed at four values. Levels are written uppercase on the
/// wire (`"ERROR"`) but lowercase input is accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    #[serde(alias = "debug")]
    Debug,
    /// Informational messages.
    #[serde(alias = "info")]
    Info,
    /// Warning conditions.
    #[serde(alias = "warn", alias = "WARNING", alias = "warning")]
    Warn,
    /// Error conditions.
    #[serde(alias = "error")]
    Error,
}

impl LogLevel {
    /// All levels, in ascending severity.
    pub const ALL: [LogLevel; 4] = [Self::Debug, Self::Info, Self::Warn, Self::Error];

    /// Returns the canonical uppercase name of the level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = LogValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            _ => Err(LogValidationError::UnknownLevel(s.to_string())),
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// A single application log line emitted by a service.
///
/// # Example
///
/// ```
/// use shared::models::{LogEntry, LogLevel};
///
/// let log = LogEntry::new("checkout", LogLevel::Error, "payment gateway timeout")
///     .with_trace_id("trace-abc");
///
/// assert!(log.validate_entry().is_ok());
/// assert!(log.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct LogEntry {
    /// Name of the service that generated the log.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// Timestamp when the log event occurred.
    pub timestamp: DateTime<Utc>,

    /// Severity level of the log.
    #[serde(default)]
    pub level: LogLevel,

    /// The log message content.
    #[validate(length(min = 1, message = "Message cannot be empty"))]
    pub message: String,

    /// Optional trace ID for distributed tracing correlation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// Errors that can occur during log entry validation.
#[derive(Debug, Error)]
pub enum LogValidationError {
    /// The log message is empty.
    #[error("Log message cannot be empty")]
    EmptyMessage,

    /// The service name is empty.
    #[error("Service name cannot be empty")]
    EmptyService,

    /// The level string is not one of DEBUG, INFO, WARN, ERROR.
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    /// The timestamp cannot be stored as nanoseconds since the epoch.
    #[error("Timestamp {0} is outside the storable range (1677-09-21 to 2262-04-11)")]
    TimestampOutOfRange(DateTime<Utc>),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl LogEntry {
    /// Creates a new log entry stamped with the current time.
    #[must_use]
    pub fn new(service: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            trace_id: None,
        }
    }

    /// Sets the timestamp of the log entry.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Sets the trace ID for distributed tracing correlation.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Returns true for `ERROR` level entries.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.level == LogLevel::Error
    }

    /// Validates the log entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the message or the service name is empty.
    pub fn validate_entry(&self) -> Result<(), LogValidationError> {
        if self.message.is_empty() {
            return Err(LogValidationError::EmptyMessage);
        }
        if self.service.is_empty() {
            return Err(LogValidationError::EmptyService);
        }
        if !super::storable_timestamp(self.timestamp) {
            return Err(LogValidationError::TimestampOutOfRange(self.timestamp));
        }
        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_entry_new() {
        let log = LogEntry::new("test-service", LogLevel::Info, "Test message");

        assert_eq!(log.level, LogLevel::Info);
        assert_eq!(log.message, "Test message");
        assert_eq!(log.service, "test-service");
        assert!(log.trace_id.is_none());
        assert!(!log.is_error());
    }

    #[test]
    fn test_log_entry_serialization_uses_uppercase_level() {
        let log = LogEntry::new("api", LogLevel::Error, "Something failed");

        let json = serde_json::to_string(&log).unwrap();

        assert!(json.contains("\"level\":\"ERROR\""));
        assert!(json.contains("\"service\":\"api\""));
        assert!(!json.contains("trace_id"));
    }

    #[test]
    fn test_log_entry_deserialization_accepts_lowercase() {
        let json = r#"{
            "service": "monitor",
            "timestamp": "2024-01-15T10:30:00Z",
            "level": "warn",
            "message": "High memory usage",
            "trace_id": "trace-123"
        }"#;

        let log: LogEntry = serde_json::from_str(json).unwrap();

        assert_eq!(log.level, LogLevel::Warn);
        assert_eq!(log.trace_id.as_deref(), Some("trace-123"));
    }

    #[test]
    fn test_log_entry_deserialization_defaults_level() {
        let json = r#"{
            "service": "test",
            "timestamp": "2024-01-15T10:30:00Z",
            "message": "Simple log"
        }"#;

        let log: LogEntry = serde_json::from_str(json).unwrap();

        assert_eq!(log.level, LogLevel::Info);
    }

    #[test]
    fn test_log_entry_validation_empty_message() {
        let log = LogEntry::new("service", LogLevel::Info, "");
        assert!(matches!(
            log.validate_entry(),
            Err(LogValidationError::EmptyMessage)
        ));
    }

    #[test]
    fn test_log_entry_validation_empty_service() {
        let log = LogEntry::new("", LogLevel::Info, "message");
        assert!(matches!(
            log.validate_entry(),
            Err(LogValidationError::EmptyService)
        ));
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("error".parse::<LogLevel>().unwrap(), LogLevel::Error);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("fatal".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Debug.to_string(), "DEBUG");
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_log_entry_validation_rejects_unstorable_timestamp() {
        let far_future = DateTime::parse_from_rfc3339("2300-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let log =
            LogEntry::new("api", LogLevel::Info, "from the future").with_timestamp(far_future);

        assert!(matches!(
            log.validate_entry(),
            Err(LogValidationError::TimestampOutOfRange(ts)) if ts == far_future
        ));
    }
}
