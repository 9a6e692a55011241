//! Event storage trait and implementations.

use super::sql::{self, WhereClause};
use crate::models::{Event, EventSeverity};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during event store operations.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on event store")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Query parameters for retrieving events.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Filter by service name.
    pub service: Option<String>,

    /// Filter by event type.
    pub event_type: Option<String>,

    /// Filter by severity.
    pub severity: Option<EventSeverity>,

    /// Filter events starting from this time (inclusive).
    pub start_time: Option<DateTime<Utc>>,

    /// Filter events up to this time (exclusive).
    pub end_time: Option<DateTime<Utc>>,

    /// Maximum number of events to return.
    pub limit: Option<usize>,

    /// Number of events to skip (for pagination).
    pub offset: Option<usize>,
}

impl EventQuery {
    /// Creates a new empty query (returns all events).
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

    /// Sets the event type filter.
    #[must_use]
    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    /// Sets the severity filter.
    #[must_use]
    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = Some(severity);
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

    fn matches(&self, event: &Event) -> bool {
        if let Some(start) = self.start_time {
            if event.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if event.timestamp >= end {
                return false;
            }
        }
        if let Some(ref service) = self.service {
            if &event.service != service {
                return false;
            }
        }
        if let Some(ref event_type) = self.event_type {
            if &event.event_type != event_type {
                return false;
            }
        }
        if let Some(severity) = self.severity {
            if event.severity != severity {
                return false;
            }
        }
        true
    }
}

/// Result of an event query operation.
#[derive(Debug, Clone)]
pub struct EventQueryResult {
    /// The events matching the query, newest first.
    pub events: Vec<Event>,

    /// Total count of matching events (before limit/offset applied).
    pub total_count: usize,
}

/// Trait for event storage implementations.
///
/// Implementations must be thread-safe (Send + Sync).
pub trait EventStore: Send + Sync {
    /// Inserts a single event into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert(&self, event: Event) -> Result<(), EventStoreError>;

    /// Inserts multiple events into the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    fn insert_batch(&self, events: Vec<Event>) -> Result<(), EventStoreError>;

    /// Queries events based on the provided parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the query operation fails.
    fn query(&self, query: EventQuery) -> Result<EventQueryResult, EventStoreError>;

    /// Returns the total number of events in the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the count operation fails.
    fn count(&self) -> Result<usize, EventStoreError>;

    /// Returns the distinct service names that have events, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    fn services(&self) -> Result<Vec<String>, EventStoreError>;

    /// Clears all events from the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the clear operation fails.
    fn clear(&self) -> Result<(), EventStoreError>;
}

/// In-memory event store implementation.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<Event>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Creates a new in-memory event store wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl EventStore for InMemoryEventStore {
    fn insert(&self, event: Event) -> Result<(), EventStoreError> {
        let mut events = self.events.write().map_err(|_| EventStoreError::LockError)?;
        events.push(event);
        Ok(())
    }

    fn insert_batch(&self, new_events: Vec<Event>) -> Result<(), EventStoreError> {
        let mut events = self.events.write().map_err(|_| EventStoreError::LockError)?;
        events.extend(new_events);
        Ok(())
    }

    fn query(&self, query: EventQuery) -> Result<EventQueryResult, EventStoreError> {
        let events = self.events.read().map_err(|_| EventStoreError::LockError)?;

        let mut filtered: Vec<Event> = events
            .iter()
            .filter(|event| query.matches(event))
            .cloned()
            .collect();
        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let total_count = filtered.len();
        let events = filtered
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(EventQueryResult {
            events,
            total_count,
        })
    }

    fn count(&self) -> Result<usize, EventStoreError> {
        let events = self.events.read().map_err(|_| EventStoreError::LockError)?;
        Ok(events.len())
    }

    fn services(&self) -> Result<Vec<String>, EventStoreError> {
        let events = self.events.read().map_err(|_| EventStoreError::LockError)?;
        let names: BTreeSet<&str> = events.iter().map(|e| e.service.as_str()).collect();
        Ok(names.into_iter().map(String::from).collect())
    }

    fn clear(&self) -> Result<(), EventStoreError> {
        let mut events = self.events.write().map_err(|_| EventStoreError::LockError)?;
        events.clear();
        Ok(())
    }
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct EventRow {
    service: String,
    timestamp: i64,
    #[serde(rename = "type")]
    event_type: String,
    details: String,
    severity: String,
}

impl From<Event> for EventRow {
    fn from(event: Event) -> Self {
        Self {
            service: event.service,
            timestamp: sql::to_nanos(event.timestamp),
            event_type: event.event_type,
            details: event.details,
            severity: event.severity.to_string(),
        }
    }
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            service: row.service,
            timestamp: sql::from_nanos(row.timestamp),
            event_type: row.event_type,
            details: row.details,
            severity: row.severity.parse().unwrap_or_default(),
        }
    }
}

/// `ClickHouse`-backed event store implementation.
///
/// Reads and writes the `events` table.
#[derive(Clone)]
pub struct ClickHouseEventStore {
    client: Arc<clickhouse::Client>,
}

impl ClickHouseEventStore {
    /// Creates a new `ClickHouse` event store with the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a new `ClickHouse` event store wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }
}

impl EventStore for ClickHouseEventStore {
    fn insert(&self, event: Event) -> Result<(), EventStoreError> {
        self.insert_batch(vec![event])
    }

    fn insert_batch(&self, events: Vec<Event>) -> Result<(), EventStoreError> {
        if events.is_empty() {
            return Ok(());
        }

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let mut inserter = client.insert::<EventRow>("events").await?;
                for event in events {
                    inserter.write(&EventRow::from(event)).await?;
                }
                inserter.end().await?;
                Ok(())
            },
            EventStoreError::StorageError,
        )
    }

    fn query(&self, query: EventQuery) -> Result<EventQueryResult, EventStoreError> {
        let mut clause = WhereClause::new();
        clause.time_range(query.start_time, query.end_time);
        if let Some(ref service) = query.service {
            clause.eq("service", service);
        }
        if let Some(ref event_type) = query.event_type {
            clause.eq("type", event_type);
        }
        if let Some(severity) = query.severity {
            clause.eq("severity", severity.as_str());
        }

        let count_sql = format!("SELECT count() FROM events{}", clause.as_str());
        let rows_sql = format!(
            "SELECT service, timestamp, type, details, severity FROM events{}{}",
            clause.as_str(),
            sql::page(query.limit, query.offset)
        );

        let client = Arc::clone(&self.client);
        sql::block_on(
            async move {
                let total_count: u64 = client.query(&count_sql).fetch_one::<u64>().await?;
                let rows: Vec<EventRow> = client.query(&rows_sql).fetch_all::<EventRow>().await?;

                Ok(EventQueryResult {
                    events: rows.into_iter().map(Event::from).collect(),
                    total_count: usize::try_from(total_count).unwrap_or(usize::MAX),
                })
            },
            EventStoreError::StorageError,
        )
    }

    fn count(&self) -> Result<usize, EventStoreError> {
        let client = Arc::clone(&self.client);
        let count: u64 = sql::block_on(
            async move {
                client
                    .query("SELECT count() FROM events")
                    .fetch_one::<u64>()
                    .await
            },
            EventStoreError::StorageError,
        )?;

        Ok(usize::try_from(count).unwrap_or(usize::MAX))
    }

    fn services(&self) -> Result<Vec<String>, EventStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            sql::distinct_services(client, "events"),
            EventStoreError::StorageError,
        )
    }

    fn clear(&self) -> Result<(), EventStoreError> {
        let client = Arc::clone(&self.client);
        sql::block_on(
            async move { client.query("TRUNCATE TABLE events").execute().await },
            EventStoreError::StorageError,
        )
    }
}
