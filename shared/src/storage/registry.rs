//! Service registry lookups.
//!
//! Maps service names to stable numeric identifiers. Services that were
//! never registered report id `0` in health summaries.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to acquire lock on the registry.
    #[error("Failed to acquire lock on service registry")]
    LockError,

    /// Generic storage error.
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Lookup of numeric service identifiers by name.
pub trait ServiceRegistry: Send + Sync {
    /// Returns the identifier registered for `name`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    fn service_id(&self, name: &str) -> Result<Option<u64>, RegistryError>;

    /// Registers `name` under `id`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be updated.
    fn register(&self, name: &str, id: u64) -> Result<(), RegistryError>;
}

/// In-memory service registry.
#[derive(Debug, Default)]
pub struct InMemoryServiceRegistry {
    services: Arc<RwLock<HashMap<String, u64>>>,
}

impl InMemoryServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry wrapped in an Arc.
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn service_id(&self, name: &str) -> Result<Option<u64>, RegistryError> {
        let services = self
            .services
            .read()
            .map_err(|_| RegistryError::LockError)?;
        Ok(services.get(name).copied())
    }

    fn register(&self, name: &str, id: u64) -> Result<(), RegistryError> {
        let mut services = self
            .services
            .write()
            .map_err(|_| RegistryError::LockError)?;
        services.insert(name.to_string(), id);
        Ok(())
    }
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct ServiceIdRow {
    id: u64,
}

#[derive(clickhouse::Row, serde::Serialize, serde::Deserialize)]
struct ServiceEntryRow {
    id: u64,
    name: String,
}

/// `ClickHouse`-backed registry reading the `services` table.
#[derive(Clone)]
pub struct ClickHouseServiceRegistry {
    client: Arc<clickhouse::Client>,
}

impl ClickHouseServiceRegistry {
    /// Creates a registry backed by the given client.
    #[must_use]
    pub fn new(client: Arc<clickhouse::Client>) -> Self {
        Self { client }
    }

    /// Creates a registry wrapped in an Arc.
    #[must_use]
    pub fn new_shared(client: Arc<clickhouse::Client>) -> Arc<Self> {
        Arc::new(Self::new(client))
    }
}

impl ServiceRegistry for ClickHouseServiceRegistry {
    fn service_id(&self, name: &str) -> Result<Option<u64>, RegistryError> {
        let client = Arc::clone(&self.client);
        let sql = format!(
            "SELECT id FROM services WHERE name = {} LIMIT 1",
            super::sql::quote(name)
        );
        super::sql::block_on(
            async move {
                let row = client.query(&sql).fetch_optional::<ServiceIdRow>().await?;
                Ok(row.map(|r| r.id))
            },
            RegistryError::StorageError,
        )
    }

    fn register(&self, name: &str, id: u64) -> Result<(), RegistryError> {
        let client = Arc::clone(&self.client);
        let row = ServiceEntryRow {
            id,
            name: name.to_string(),
        };
        super::sql::block_on(
            async move {
                let mut inserter = client.insert::<ServiceEntryRow>("services").await?;
                inserter.write(&row).await?;
                inserter.end().await?;
                Ok(())
            },
            RegistryError::StorageError,
        )
    }
}
