//! Infrastructure event data model.
//!
//! Events are discrete happenings reported alongside a service's telemetry:
//! deployments, config changes, scaling actions, restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::Validate;

/// Event types counted individually in event statistics.
///
/// The `type` field of an [`Event`] is free text; anything outside this list is
/// still stored and queried but only contributes to the total count.
pub const KNOWN_EVENT_TYPES: [&str; 4] = ["config_change", "deployment", "scaling", "restart"];

/// Severity attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventSeverity {
    /// Service-impacting event.
    Critical,
    /// Potentially impacting event.
    Warning,
    /// Informational event.
    #[default]
    Info,
}

impl EventSeverity {
    /// All severities, most severe first.
    pub const ALL: [EventSeverity; 3] = [Self::Critical, Self::Warning, Self::Info];

    /// Returns the lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventSeverity {
    type Err = EventValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "warning" | "warn" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            _ => Err(EventValidationError::UnknownSeverity(s.to_string())),
        }
    }
}

/// A system or infrastructure event.
///
/// # Example
///
/// ```
/// use shared::models::{Event, EventSeverity};
///
/// let event = Event::new("checkout", "deployment", "rolled out v2.3.1")
///     .with_severity(EventSeverity::Warning);
///
/// assert!(event.validate_event().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Event {
    /// Name of the service the event concerns.
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Event type, e.g. `deployment`.
    #[serde(rename = "type")]
    #[validate(length(min = 1, message = "Event type cannot be empty"))]
    pub event_type: String,

    /// Free-text details.
    #[serde(default)]
    pub details: String,

    /// Severity of the event.
    #[serde(default)]
    pub severity: EventSeverity,
}

/// Errors that can occur during event validation.
#[derive(Debug, Error)]
pub enum EventValidationError {
    /// The service name is empty.
    #[error("Service name cannot be empty")]
    EmptyService,

    /// The event type is empty.
    #[error("Event type cannot be empty")]
    EmptyType,

    /// The severity string is not recognized.
    #[error("Unknown event severity: {0}")]
    UnknownSeverity(String),

    /// The timestamp cannot be stored as nanoseconds since the epoch.
    #[error("Timestamp {0} is outside the storable range (1677-09-21 to 2262-04-11)")]
    TimestampOutOfRange(DateTime<Utc>),

    /// Validation failed with details.
    #[error("Validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

impl Event {
    /// Creates a new informational event happening now.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        event_type: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            timestamp: Utc::now(),
            event_type: event_type.into(),
            details: details.into(),
            severity: EventSeverity::default(),
        }
    }

    /// Sets the severity.
    #[must_use]
    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the timestamp of the event.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Validates the event.
    ///
    /// # Errors
    ///
    /// Returns an error if the service name or the event type is empty.
    pub fn validate_event(&self) -> Result<(), EventValidationError> {
        if self.service.is_empty() {
            return Err(EventValidationError::EmptyService);
        }
        if self.event_type.is_empty() {
            return Err(EventValidationError::EmptyType);
        }
        if !super::storable_timestamp(self.timestamp) {
            return Err(EventValidationError::TimestampOutOfRange(self.timestamp));
        }
        self.validate()?;
        Ok(())
    }
}
