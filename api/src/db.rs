//! Database connection module for `ClickHouse`.
//!
//! Builds the shared `ClickHouse` client from environment variables. The
//! telemetry tables (`logs`, `metrics`, `traces`, `events`, `services`) are
//! expected to exist already.

use anyhow::{Context, Result};
use clickhouse::Client;
use std::sync::Arc;

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `ClickHouse` database URL (e.g., <http://localhost:8123>)
    pub url: String,
    /// Database name to use
    pub database: String,
    /// Username for authentication
    pub user: String,
    /// Password for authentication
    pub password: String,
}

impl DatabaseConfig {
    /// Load database configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TRIAGE_DB_URL`: Database URL (default: <http://localhost:8123>)
    /// - `TRIAGE_DB_NAME`: Database name (default: "triage")
    /// - `TRIAGE_DB_USER`: Database user (default: "triage")
    /// - `TRIAGE_DB_PASSWORD`: Database password (default: "`triage_dev`")
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };

        Self {
            url: var("TRIAGE_DB_URL", "http://localhost:8123"),
            database: var("TRIAGE_DB_NAME", "triage"),
            user: var("TRIAGE_DB_USER", "triage"),
            password: var("TRIAGE_DB_PASSWORD", "triage_dev"),
        }
    }
}

/// Shared `ClickHouse` client handle.
#[derive(Clone)]
pub struct Database {
    client: Arc<Client>,
}

impl Database {
    /// Create a new database client from configuration.
    #[must_use]
    pub fn new(config: &DatabaseConfig) -> Self {
        let client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database)
            .with_user(&config.user)
            .with_password(&config.password);

        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying `ClickHouse` client.
    #[must_use]
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    /// Test database connectivity by executing a simple query.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or the query fails.
    pub async fn ping(&self) -> Result<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .context("Failed to ping database")?;
        Ok(())
    }
}
