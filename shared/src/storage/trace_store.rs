//! Trace span storage trait and implementations.
//!
//! Spans are stored one row per span in the `traces` table. Queries filter
//! and page individual spans; latency statistics are computed over them.

use super::sql::{self, WhereClause};
use crate::models::TraceSpan;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during trace store operations.
#[derive(Debug, Error)]
pub enum TraceStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on trace store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Query parameters for retrieving spans.
#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    /// Filter by service name.
    pub service: Option<String>,

    /// Filter by trace ID.
    pub trace_id: Option<String>,

    /// Filter by operation name.
    pub operation: Option<String>,

    /// Filter by status.
    pub status: Option<String>,

    /// Only spans strictly slower than this many milliseconds.
    pub min_duration_ms: Option<f64>,

    /// Filter spans starting from this time (inclusive).
    pub start_time: Option<DateTime<Utc>>,

    /// Filter spans up to this time (exclusive).
    pub end_time: Option<DateTime<Utc>>,

    /// Maximum number of spans to return.
    pub limit: Option<usize>,

    /// Number of spans to skip (for pagination).
    pub offset: Option<usize>,
}

impl TraceQuery {
    /// Creates a new empty query (returns all spans).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service filter.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Sets the service filter from an optional value.
    #[must_use]
    pub fn with_service_opt(mut self, service: Option<&str>) -> Self {
        self.service = service.map(str::to_string);
        self
    }

    /// Sets the trace ID filter.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the operation filter.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Sets the status filter.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Keeps only spans whose duration is strictly greater than `ms`.
    #[must_use]
    pub fn with_min_duration_ms(mut self, ms: f64) -> Self {
        self.min_duration_ms = Some(ms);
        self
    }

    /// Sets the start time filter.
    #[must_use]
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Sets the end time filter.
    #[must_use]
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the offset for pagination.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    fn matches(&self, span: &TraceSpan) -> bool {
        if let Some(start) = self.start_time {
            if span.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if span.timestamp >= end {
                return false;
            }
        }
        if let Some(ref service) = self.service {
            if &span.service != service {
                return false;
            }
        }
        if let Some(ref trace_id) = self.trace_id {
            if &span.trace_id != trace_id {
                return false;
            }
        }
        if let Some(ref operation) = self.operation {
            if &span.operation != operation {
                return false;
            }
        }
        if let Some(ref status) = self.status {
            if span.status.as_ref() != Some(status) {
                return false;
            }
        }
        if let Some(min) = self.min_duration_ms {
            if span.duration_ms <= min {
                return false;
            }
        }
        true
    }
}

/// Result of a span query operation.
#[derive(Debug, Clone)]
pub struct TraceQueryResult {
    /// The spans matching the query, newest first.
    pub spans: Vec<TraceSpan>,

    /// Total count of matching spans (before limit/offset applied).
    pub total_count: usize,
}

/// Trait for trace storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait TraceStore: Send + Sync {
    /// Inserts a single span into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert(&self, span: TraceSpan) -> Result<(), TraceStoreError>;

    /// Inserts multiple spans into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert_batch(&self, spans: Vec<TraceSpan>) -> Result<(), TraceStoreError>;

    /// Queries spans based on the provided parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn query(&self, query: TraceQuery) -> Result<TraceQueryResult, TraceStoreError>;

    /// Returns the total number of spans in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, TraceStoreError>;

    /// Returns the distinct service names that have spans, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn services(&self) -> Result<Vec<String>, TraceStoreError>;

    /// Clears all spans from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), TraceStoreError>;
}

/// In-memory trace store implementation.
#[derive(Debug, Default)]
pub struct InMemoryTraceStore {
    spans: Arc<RwLock<Vec<TraceSpan>>>,
}

impl InMemoryTraceStore {
    /// Creates a new empty in-memory trace store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spans: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory trace store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl TraceStore for InMemoryTraceStore {
    fn insert(&self, span: TraceSpan) -> Result<(), TraceStoreError> {
        let mut spans = self.spans.write().map_err(|_| TraceStoreError::LockError)?;
        spans.push(span);
        Ok(())
    }

    fn insert_batch(&self, new_spans: Vec<TraceSpan>) -> Result<(), TraceStoreError> {
        let mut spans = self.spans.write().map_err(|_| TraceStoreError::LockError)?;
        spans.extend(new_spans);
        Ok(())
    }

    fn query(&self, query: TraceQuery) -> Result<TraceQueryResult, TraceStoreError> {
        let spans = self.spans.read().map_err(|_| TraceStoreError::LockError)?;

        let mut filtered: Vec<TraceSpan> = spans
            .iter()
            .filter(|span| query.matches(span))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total_count = filtered.len();
        let spans = filtered
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(TraceQueryResult { spans, total_count })
    }

    fn count(&self) -> Result<usize, TraceStoreError> {
        let spans = self.spans.read().map_err(|_| TraceStoreError::LockError)?;
        Ok(spans.len())
    }

    fn services(&self) -> Result<Vec<String>, TraceStoreError> {
        let spans = self.spans.read().map_err(|_| TraceStoreError::LockError)?;
        let names: BTreeSet<&str> = spans.iter().map(|s| s.service.as_str()).collect();
        Ok(names.into_iter().map(String::from).collect())
    }

    fn clear(&self) -> Result<(), TraceStoreError> {
        let mut spans = self.spans.write().map_err(|_| TraceStoreError::LockError)?;
        spans.clear();
        Ok(())
    }
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct SpanRow {
    trace_id: String,
    span_id: String,
    parent_span_id: String,
    service: String,
    operation: String,
    duration: f64,
    timestamp: i64,
    status: String,
}

impl From<TraceSpan> for SpanRow {
    fn from(span: TraceSpan) -> Self {
        Self {
            trace_id: span.trace_id,
            span_id: span.span_id,
            parent_span_id: span.parent_span_id.unwrap_or_default(),
            service: span.service,
            operation: span.operation,
            duration: span.duration_ms,
            timestamp: sql::to_nanos(span.timestamp),
            status: span.status.unwrap_or_default(),
        }
    }
}

impl From<SpanRow> for TraceSpan {
    fn from(row: SpanRow) -> Self {
        Self {
            trace_id: row.trace_id,
            span_id: row.span_id,
            parent_span_id: (!row.parent_span_id.is_empty()).then_some(row.parent_span_id),
            service: row.service,
            operation: row.operation,
            duration_ms: row.duration,
            timestamp: sql::from_nanos(row.timestamp),
            status: (!row.status.is_empty()).then_some(row.status),
        }
    }
}

/// `ClickHouse`-backed trace store implementation.
///
/// Reads and writes the `traces` table.
#[derive(Clone)]
pub struct ClickHouseTraceStore {
    client: Arc<clickhouse::Client>,
}

impl ClickHouseTraceStore {
    /// Creates a new `ClickHouse` trace store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a new `ClickHouse` trace store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }

    fn where_clause(query: &TraceQuery) -> WhereClause {
        let mut clause = WhereClause::new();
        clause.time_range(query.start_time, query.end_time);
        if let Some(ref service) = query.service {
            clause.eq("service", service);
        }
        if let Some(ref trace_id) = query.trace_id {
            clause.eq("trace_id", trace_id);
        }
        if let Some(ref operation) = query.operation {
            clause.eq("operation", operation);
        }
        if let Some(ref status) = query.status {
            clause.eq("status", status);
        }
        if let Some(min) = query.min_duration_ms {
            clause.raw(&format!("duration > {min}"));
        }
        clause
    }
}

impl TraceStore for ClickHouseTraceStore {
    fn insert(&self, span: TraceSpan) -> Result<(), TraceStoreError> {
        self.insert_batch(vec![span])
    }

    fn insert_batch(&self, spans: Vec<TraceSpan>) -> Result<(), TraceStoreError> {
        if spans.is_empty() {
            return Ok(());
        }

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let mut inserter = client.insert::<SpanRow>("traces").await?;
                for span in spans {
                    inserter.write(&SpanRow::from(span)).await?;
                }
                inserter.end().await?;
                Ok(())
            },
            TraceStoreError::StorageError,
        )
    }

    fn query(&self, query: TraceQuery) -> Result<TraceQueryResult, TraceStoreError> {
        let clause = Self::where_clause(&query);
        let count_sql = format!("SELECT count() FROM traces{}", clause.as_str());
        let rows_sql = format!(
            "SELECT trace_id, span_id, parent_span_id, service, operation, duration, timestamp, status FROM traces{}{}",
            clause.as_str(),
            sql::page(query.limit, query.offset)
        );

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let total_count: u64 = client.query(&count_sql).fetch_one::<u64>().await?;
                let rows: Vec<SpanRow> = client.query(&rows_sql).fetch_all::<SpanRow>().await?;

                Ok(TraceQueryResult {
                    spans: rows.into_iter().map(TraceSpan::from).collect(),
                    total_count: usize::try_from(total_count).unwrap_or(usize::MAX),
                })
            },
            TraceStoreError::StorageError,
        )
    }

    fn count(&self) -> Result<usize, TraceStoreError> {
        let client = Arc::clone(&self.client);
        let count: u64 = sql::block_on(
            async move {
                client
                    .query("SELECT count() FROM traces")
                    .fetch_one::<u64>()
                    .await
            },
            TraceStoreError::StorageError,
        )?;

        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn services(&self) -> Result<Vec<String>, TraceStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            sql::distinct_services(client, "traces"),
            TraceStoreError::StorageError,
        )
    }

    fn clear(&self) -> Result<(), TraceStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            async move { client.query("TRUNCATE TABLE traces").execute().await },
            TraceStoreError::StorageError,
        )
    }
}
