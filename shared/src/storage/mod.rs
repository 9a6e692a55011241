//! Storage traits and implementations.
//!
//! Each telemetry kind has its own store trait (`LogStore`, `MetricStore`,
//! `TraceStore`, `EventStore`) with an in-memory and a `ClickHouse`
//! implementation. [`TelemetryStores`] bundles one of each together with the
//! service registry so analysis code can be handed a single value.

pub mod event_store;
pub mod log_store;
pub mod metric_store;
pub mod registry;
mod sql;
pub mod trace_store;

use std::sync::Arc;

pub use event_store::{
    ClickHouseEventStore, EventQuery, EventQueryResult, EventStore, EventStoreError,
    InMemoryEventStore,
};
pub use log_store::{
    ClickHouseLogStore, InMemoryLogStore, LogQuery, LogQueryResult, LogStore, LogStoreError,
};
pub use metric_store::{
    ClickHouseMetricStore, InMemoryMetricStore, MetricQuery, MetricQueryResult, MetricStore,
    MetricStoreError,
};
pub use registry::{
    ClickHouseServiceRegistry, InMemoryServiceRegistry, RegistryError, ServiceRegistry,
};
pub use trace_store::{
    ClickHouseTraceStore, InMemoryTraceStore, TraceQuery, TraceQueryResult, TraceStore,
    TraceStoreError,
};

/// Backend family behind a [`TelemetryStores`] bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local stores, lost on restart.
    Memory,
    /// `ClickHouse` tables.
    ClickHouse,
}

impl StorageKind {
    /// Returns the lowercase name of the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::ClickHouse => "clickhouse",
        }
    }
}

/// The full set of telemetry stores used by the analysis layer.
#[derive(Clone)]
pub struct TelemetryStores {
    /// Which backend the stores use.
    pub kind: StorageKind,
    /// Log storage.
    pub logs: Arc<dyn LogStore>,
    /// Metric storage.
    pub metrics: Arc<dyn MetricStore>,
    /// Trace span storage.
    pub traces: Arc<dyn TraceStore>,
    /// Event storage.
    pub events: Arc<dyn EventStore>,
    /// Service id lookup.
    pub registry: Arc<dyn ServiceRegistry>,
}

impl TelemetryStores {
    /// Creates a bundle of empty in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            kind: StorageKind::Memory,
            logs: InMemoryLogStore::new_shared(),
            metrics: InMemoryMetricStore::new_shared(),
            traces: InMemoryTraceStore::new_shared(),
            events: InMemoryEventStore::new_shared(),
            registry: InMemoryServiceRegistry::new_shared(),
        }
    }

    /// Creates a bundle of `ClickHouse` stores sharing one client.
    #[must_use]
    pub fn clickhouse(client: &Arc<clickhouse::Client>) -> Self {
        Self {
            kind: StorageKind::ClickHouse,
            logs: ClickHouseLogStore::new_shared(Arc::clone(client)),
            metrics: ClickHouseMetricStore::new_shared(Arc::clone(client)),
            traces: ClickHouseTraceStore::new_shared(Arc::clone(client)),
            events: ClickHouseEventStore::new_shared(Arc::clone(client)),
            registry: ClickHouseServiceRegistry::new_shared(Arc::clone(client)),
        }
    }
}

impl std::fmt::Debug for TelemetryStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryStores")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
