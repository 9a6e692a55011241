//! Metric storage trait and implementations.
//!
//! Provides the `MetricStore` trait for abstracting metric storage operations
//! and its in-memory and `ClickHouse` implementations.

use super::sql::{self, WhereClause};
use crate::models::MetricPoint;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during metric store operations.
#[derive(Debug, Error)]
pub enum MetricStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on metric store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Query parameters for retrieving metric samples.
#[derive(Debug, Clone, Default)]
pub struct MetricQuery {
    /// Filter by service name.
    pub service: Option<String>,

    /// Filter by metric name.
    pub metric_name: Option<String>,

    /// Filter samples starting from this time (inclusive).
    pub start_time: Option<DateTime<Utc>>,

    /// Filter samples up to this time (exclusive).
    pub end_time: Option<DateTime<Utc>>,

    /// Maximum number of samples to return.
    pub limit: Option<usize>,

    /// Number of samples to skip (for pagination).
    pub offset: Option<usize>,
}

impl MetricQuery {
    /// Creates a new empty query (returns all samples).
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

    /// Sets the metric name filter.
    #[must_use]
    pub fn with_metric_name(mut self, name: impl Into<String>) -> Self {
        self.metric_name = Some(name.into());
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

    fn matches(&self, point: &MetricPoint) -> bool {
        if let Some(start) = self.start_time {
            if point.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if point.timestamp >= end {
                return false;
            }
        }
        if let Some(ref service) = self.service {
            if &point.service != service {
                return false;
            }
        }
        if let Some(ref name) = self.metric_name {
            if &point.metric_name != name {
                return false;
            }
        }
        true
    }
}

/// Result of a metric query operation.
#[derive(Debug, Clone)]
pub struct MetricQueryResult {
    /// The samples matching the query, newest first.
    pub metrics: Vec<MetricPoint>,

    /// Total count of matching samples (before limit/offset applied).
    pub total_count: usize,
}

/// Trait for metric storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait MetricStore: Send + Sync {
    /// Inserts a single sample into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert(&self, point: MetricPoint) -> Result<(), MetricStoreError>;

    /// Inserts multiple samples into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert_batch(&self, points: Vec<MetricPoint>) -> Result<(), MetricStoreError>;

    /// Queries samples based on the provided parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn query(&self, query: MetricQuery) -> Result<MetricQueryResult, MetricStoreError>;

    /// Returns the total number of samples in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, MetricStoreError>;

    /// Returns the distinct service names that have samples, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn services(&self) -> Result<Vec<String>, MetricStoreError>;

    /// Clears all samples from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), MetricStoreError>;
}

/// In-memory metric store implementation.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    metrics: Arc<RwLock<Vec<MetricPoint>>>,
}

impl InMemoryMetricStore {
    /// Creates a new empty in-memory metric store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory metric store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl MetricStore for InMemoryMetricStore {
    fn insert(&self, point: MetricPoint) -> Result<(), MetricStoreError> {
        let mut metrics = self
            .metrics
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        metrics.push(point);
        Ok(())
    }

    fn insert_batch(&self, points: Vec<MetricPoint>) -> Result<(), MetricStoreError> {
        let mut metrics = self
            .metrics
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        metrics.extend(points);
        Ok(())
    }

    fn query(&self, query: MetricQuery) -> Result<MetricQueryResult, MetricStoreError> {
        let metrics = self
            .metrics
            .read()
            .map_err(|_| MetricStoreError::LockError)?;

        let mut filtered: Vec<MetricPoint> = metrics
            .iter()
            .filter(|point| query.matches(point))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total_count = filtered.len();
        let metrics = filtered
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(MetricQueryResult {
            metrics,
            total_count,
        })
    }

    fn count(&self) -> Result<usize, MetricStoreError> {
        let metrics = self
            .metrics
            .read()
            .map_err(|_| MetricStoreError::LockError)?;
        Ok(metrics.len())
    }

    fn services(&self) -> Result<Vec<String>, MetricStoreError> {
        let metrics = self
            .metrics
            .read()
            .map_err(|_| MetricStoreError::LockError)?;
        let names: BTreeSet<&str> = metrics.iter().map(|m| m.service.as_str()).collect();
        Ok(names.into_iter().map(String::from).collect())
    }

    fn clear(&self) -> Result<(), MetricStoreError> {
        let mut metrics = self
            .metrics
            .write()
            .map_err(|_| MetricStoreError::LockError)?;
        metrics.clear();
        Ok(())
    }
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct MetricRow {
    service: String,
    metric_name: String,
    value: f64,
    unit: String,
    timestamp: i64,
}

impl From<MetricPoint> for MetricRow {
    fn from(point: MetricPoint) -> Self {
        Self {
            service: point.service,
            metric_name: point.metric_name,
            value: point.value,
            unit: point.unit.unwrap_or_default(),
            timestamp: sql::to_nanos(point.timestamp),
        }
    }
}

impl From<MetricRow> for MetricPoint {
    fn from(row: MetricRow) -> Self {
        Self {
            service: row.service,
            metric_name: row.metric_name,
            value: row.value,
            unit: (!row.unit.is_empty()).then_some(row.unit),
            timestamp: sql::from_nanos(row.timestamp),
        }
    }
}

/// `ClickHouse`-backed metric store implementation.
///
/// Reads and writes the `metrics` table.
#[derive(Clone)]
pub struct ClickHouseMetricStore {
    client: Arc<clickhouse::Client>,
}

impl ClickHouseMetricStore {
    /// Creates a new `ClickHouse` metric store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a new `ClickHouse` metric store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }
}

impl MetricStore for ClickHouseMetricStore {
    fn insert(&self, point: MetricPoint) -> Result<(), MetricStoreError> {
        self.insert_batch(vec![point])
    }

    fn insert_batch(&self, points: Vec<MetricPoint>) -> Result<(), MetricStoreError> {
        if points.is_empty() {
            return Ok(());
        }

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let mut inserter = client.insert::<MetricRow>("metrics").await?;
                for point in points {
                    inserter.write(&MetricRow::from(point)).await?;
                }
                inserter.end().await?;
                Ok(())
            },
            MetricStoreError::StorageError,
        )
    }

    fn query(&self, query: MetricQuery) -> Result<MetricQueryResult, MetricStoreError> {
        let mut clause = WhereClause::new();
        clause.time_range(query.start_time, query.end_time);
        if let Some(ref service) = query.service {
            clause.eq("service", service);
        }
        if let Some(ref name) = query.metric_name {
            clause.eq("metric_name", name);
        }

        let count_sql = format!("SELECT count() FROM metrics{}", clause.as_str());
        let rows_sql = format!(
            "SELECT service, metric_name, value, unit, timestamp FROM metrics{}{}",
            clause.as_str(),
            sql::page(query.limit, query.offset)
        );

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let total_count: u64 = client.query(&count_sql).fetch_one::<u64>().await?;
                let rows: Vec<MetricRow> =
                    client.query(&rows_sql).fetch_all::<MetricRow>().await?;

                Ok(MetricQueryResult {
                    metrics: rows.into_iter().map(MetricPoint::from).collect(),
                    total_count: usize::try_from(total_count).unwrap_or(usize::MAX),
                })
            },
            MetricStoreError::StorageError,
        )
    }

    fn count(&self) -> Result<usize, MetricStoreError> {
        let client = Arc::clone(&self.client);
        let count: u64 = sql::block_on(
            async move {
                client
                    .query("SELECT count() FROM metrics")
                    .fetch_one::<u64>()
                    .await
            },
            MetricStoreError::StorageError,
        )?;

        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn services(&self) -> Result<Vec<String>, MetricStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            sql::distinct_services(client, "metrics"),
            MetricStoreError::StorageError,
        )
    }

    fn clear(&self) -> Result<(), MetricStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            async move { client.query("TRUNCATE TABLE metrics").execute().await },
            MetricStoreError::StorageError,
        )
    }
}
