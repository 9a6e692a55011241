//! Application state module.
//!
//! Defines the shared application state that is passed to route handlers.

use shared::ai::RootCauseAnalyzer;
use shared::dashboard::DashboardService;
use shared::storage::{EventStore, LogStore, MetricStore, TelemetryStores, TraceStore};

/// Application state shared across all request handlers.
///
/// Cloning is cheap: the stores are reference counted and shared between
/// clones.
///
/// Numeric service ids in health summaries come from the stores' service
/// registry. With in-memory storage that registry only holds what
/// `TRIAGE_SERVICE_IDS` seeded at startup; with `ClickHouse` it is the
/// `services` table. Unregistered services report id `0`.
#[derive(Clone, Debug)]
pub struct AppState {
    dashboard: DashboardService,
}

impl AppState {
    /// Creates a new application state over the given stores and analyzer.
    #[must_use]
    pub fn new(stores: TelemetryStores, analyzer: RootCauseAnalyzer) -> Self {
        Self {
            dashboard: DashboardService::new(stores, analyzer),
        }
    }

    /// Creates a new application state with in-memory stores and no LLM.
    ///
    /// This is useful for development and testing.
    #[must_use]
    pub fn with_in_memory_store() -> Self {
        Self::new(TelemetryStores::in_memory(), RootCauseAnalyzer::disabled())
    }

    /// Returns the dashboard service.
    #[must_use]
    pub fn dashboard(&self) -> &DashboardService {
        &self.dashboard
    }

    /// Returns the underlying stores.
    #[must_use]
    pub fn stores(&self) -> &TelemetryStores {
        self.dashboard.stores()
    }

    /// Returns a reference to the log store.
    #[must_use]
    pub fn log_store(&self) -> &dyn LogStore {
        self.stores().logs.as_ref()
    }

    /// Returns a reference to the metric store.
    #[must_use]
    pub fn metric_store(&self) -> &dyn MetricStore {
        self.stores().metrics.as_ref()
    }

    /// Returns a reference to the trace store.
    #[must_use]
    pub fn trace_store(&self) -> &dyn TraceStore {
        self.stores().traces.as_ref()
    }

    /// Returns a reference to the event store.
    #[must_use]
    pub fn event_store(&self) -> &dyn EventStore {
        self.stores().events.as_ref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_in_memory_store()
    }
}
