//! AI-assisted incident analysis.
//!
//! - [`backend`] - the [`TextGenerator`] seam and the chat completions client
//! - [`analyzer`] - root cause prediction, correlation scoring and severity
//!   classification built on a generator

pub mod analyzer;
pub mod backend;

pub use analyzer::{
    AiPrediction, IncidentSeverity, RootCauseAnalyzer, SeverityClassification, SeverityFactors,
    ROOT_CAUSES,
};
pub use backend::{
    extract_json, BackendSettings, ChatCompletionsBackend, GenerateFuture, GenerationError,
    TextGenerator,
};
