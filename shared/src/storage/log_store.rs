//! Log storage trait and implementations.
//!
//! Provides the `LogStore` trait for abstracting log storage operations,
//! an `InMemoryLogStore` for development and testing, and a
//! `ClickHouseLogStore` for production.

use super::sql::{self, WhereClause};
use crate::models::{LogEntry, LogLevel};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during log store operations.
#[derive(Debug, Error)]
pub enum LogStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on log store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Query parameters for retrieving logs.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Filter by service name (exact match).
    pub service: Option<String>,

    /// Filter logs starting from this time (inclusive).
    pub start_time: Option<DateTime<Utc>>,

    /// Filter logs up to this time (exclusive).
    pub end_time: Option<DateTime<Utc>>,

    /// Filter by log level.
    pub level: Option<LogLevel>,

    /// Maximum number of logs to return.
    pub limit: Option<usize>,

    /// Number of logs to skip (for pagination).
    pub offset: Option<usize>,
}

impl LogQuery {
    /// Creates a new empty query (returns all logs).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name filter (exact match).
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

    /// Sets the log level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
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

    fn matches(&self, log: &LogEntry) -> bool {
        if let Some(start) = self.start_time {
            if log.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if log.timestamp >= end {
                return false;
            }
        }
        if let Some(level) = self.level {
            if log.level != level {
                return false;
            }
        }
        if let Some(ref service) = self.service {
            if &log.service != service {
                return false;
            }
        }
        true
    }
}

/// Result of a log query operation.
#[derive(Debug, Clone)]
pub struct LogQueryResult {
    /// The logs matching the query, newest first.
    pub logs: Vec<LogEntry>,

    /// Total count of matching logs (before limit/offset applied).
    pub total_count: usize,
}

/// Trait for log storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait LogStore: Send + Sync {
    /// Inserts a single log entry into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert(&self, entry: LogEntry) -> Result<(), LogStoreError>;

    /// Inserts multiple log entries into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert_batch(&self, entries: Vec<LogEntry>) -> Result<(), LogStoreError>;

    /// Queries logs based on the provided parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn query(&self, query: LogQuery) -> Result<LogQueryResult, LogStoreError>;

    /// Returns the total number of logs in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, LogStoreError>;

    /// Returns the distinct service names that have logs, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn services(&self) -> Result<Vec<String>, LogStoreError>;

    /// Clears all logs from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), LogStoreError>;
}

/// In-memory log store implementation.
///
/// Stores logs in a `Vec` protected by a `RwLock`. Data is not persisted
/// across restarts.
///
/// # Example
///
/// ```
/// use shared::storage::{InMemoryLogStore, LogStore, LogQuery};
/// use shared::models::{LogEntry, LogLevel};
///
/// let store = InMemoryLogStore::new();
/// store.insert(LogEntry::new("api", LogLevel::Error, "boom")).unwrap();
///
/// let result = store.query(LogQuery::new().with_level(LogLevel::Error)).unwrap();
/// assert_eq!(result.total_count, 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    logs: Arc<RwLock<Vec<LogEntry>>>,
}

impl InMemoryLogStore {
    /// Creates a new empty in-memory log store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            logs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory log store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl LogStore for InMemoryLogStore {
    fn insert(&self, entry: LogEntry) -> Result<(), LogStoreError> {
        let mut logs = self.logs.write().map_err(|_| LogStoreError::LockError)?;
        logs.push(entry);
        Ok(())
    }

    fn insert_batch(&self, entries: Vec<LogEntry>) -> Result<(), LogStoreError> {
        let mut logs = self.logs.write().map_err(|_| LogStoreError::LockError)?;
        logs.extend(entries);
        Ok(())
    }

    fn query(&self, query: LogQuery) -> Result<LogQueryResult, LogStoreError> {
        let logs = self.logs.read().map_err(|_| LogStoreError::LockError)?;

        let mut filtered: Vec<LogEntry> = logs
            .iter()
            .filter(|log| query.matches(log))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total_count = filtered.len();
        let logs = filtered
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(LogQueryResult { logs, total_count })
    }

    fn count(&self) -> Result<usize, LogStoreError> {
        let logs = self.logs.read().map_err(|_| LogStoreError::LockError)?;
        Ok(logs.len())
    }

    fn services(&self) -> Result<Vec<String>, LogStoreError> {
        let logs = self.logs.read().map_err(|_| LogStoreError::LockError)?;
        let names: BTreeSet<&str> = logs.iter().map(|log| log.service.as_str()).collect();
        Ok(names.into_iter().map(String::from).collect())
    }

    fn clear(&self) -> Result<(), LogStoreError> {
        let mut logs = self.logs.write().map_err(|_| LogStoreError::LockError)?;
        logs.clear();
        Ok(())
    }
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct LogRow {
    service: String,
    timestamp: i64,
    level: String,
    message: String,
    trace_id: String,
}

impl From<LogEntry> for LogRow {
    fn from(entry: LogEntry) -> Self {
        Self {
            service: entry.service,
            timestamp: sql::to_nanos(entry.timestamp),
            level: entry.level.to_string(),
            message: entry.message,
            trace_id: entry.trace_id.unwrap_or_default(),
        }
    }
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        Self {
            service: row.service,
            timestamp: sql::from_nanos(row.timestamp),
            level: row.level.parse().unwrap_or_default(),
            message: row.message,
            trace_id: (!row.trace_id.is_empty()).then_some(row.trace_id),
        }
    }
}

/// `ClickHouse`-backed log store implementation.
///
/// Reads and writes the `logs` table.
#[derive(Clone)]
pub struct ClickHouseLogStore {
    client: Arc<clickhouse::Client>,
}

impl ClickHouseLogStore {
    /// Creates a new `ClickHouse` log store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a new `ClickHouse` log store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }

    fn where_clause(query: &LogQuery) -> WhereClause {
        let mut clause = WhereClause::new();
        clause.time_range(query.start_time, query.end_time);
        if let Some(level) = query.level {
            clause.eq("level", level.as_str());
        }
        if let Some(ref service) = query.service {
            clause.eq("service", service);
        }
        clause
    }
}

impl LogStore for ClickHouseLogStore {
    fn insert(&self, entry: LogEntry) -> Result<(), LogStoreError> {
        self.insert_batch(vec![entry])
    }

    fn insert_batch(&self, entries: Vec<LogEntry>) -> Result<(), LogStoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let mut inserter = client.insert::<LogRow>("logs").await?;
                for entry in entries {
                    inserter.write(&LogRow::from(entry)).await?;
                }
                inserter.end().await?;
                Ok(())
            },
            LogStoreError::StorageError,
        )
    }

    fn query(&self, query: LogQuery) -> Result<LogQueryResult, LogStoreError> {
        let clause = Self::where_clause(&query);
        let count_sql = format!("SELECT count() FROM logs{}", clause.as_str());
        let rows_sql = format!(
            "SELECT service, timestamp, level, message, trace_id FROM logs{}{}",
            clause.as_str(),
            sql::page(query.limit, query.offset)
        );

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let total_count: u64 = client.query(&count_sql).fetch_one::<u64>().await?;
                let rows: Vec<LogRow> = client.query(&rows_sql).fetch_all::<LogRow>().await?;

                Ok(LogQueryResult {
                    logs: rows.into_iter().map(LogEntry::from).collect(),
                    total_count: usize::try_from(total_count).unwrap_or(usize::MAX),
                })
            },
            LogStoreError::StorageError,
        )
    }

    fn count(&self) -> Result<usize, LogStoreError> {
        let client = Arc::clone(&self.client);
        let count: u64 = sql::block_on(
            async move {
                client
                    .query("SELECT count() FROM logs")
                    .fetch_one::<u64>()
                    .await
            },
            LogStoreError::StorageError,
        )?;

        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn services(&self) -> Result<Vec<String>, LogStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            sql::distinct_services(client, "logs"),
            LogStoreError::StorageError,
        )
    }

    fn clear(&self) -> Result<(), LogStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            async move { client.query("TRUNCATE TABLE logs").execute().await },
            LogStoreError::StorageError,
        )
    }
}
