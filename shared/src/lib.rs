//! Triage Shared Library
//!
//! This crate contains the telemetry models, storage, analysis and AI
//! collaborators used by the Triage incident analysis service.
//!
//! # Modules
//!
//! - [`models`] - Data models for logs, metrics, traces and events
//! - [`storage`] - Storage traits and implementations
//! - [`analysis`] - Statistics, health classification and correlation
//! - [`ai`] - LLM-backed root cause analysis
//! - [`dashboard`] - Aggregated dashboard views
//!
//! # Example
//!
//! ```
//! use shared::analysis::{log_statistics, HealthStatus};
//! use shared::models::{LogEntry, LogLevel};
//!
//! let logs = vec![
//!     LogEntry::new("checkout", LogLevel::Error, "payment declined"),
//!     LogEntry::new("checkout", LogLevel::Info, "order placed"),
//! ];
//!
//! let stats = log_statistics(&logs);
//! assert_eq!(stats.error_rate, 50.0);
//! assert_eq!(HealthStatus::classify(stats.error_rate, 120.0), HealthStatus::Critical);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ai;
pub mod analysis;
pub mod dashboard;
pub mod models;
pub mod storage;

/// Re-export common dependencies for convenience.
pub use chrono;
pub use serde;
pub use serde_json;
pub use validator;
