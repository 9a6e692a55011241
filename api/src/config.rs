//! Server configuration module.
//!
//! Handles loading configuration from environment variables with sensible defaults.

use anyhow::{bail, Context, Result};
use shared::ai::BackendSettings;
use std::net::SocketAddr;
use std::time::Duration;

/// Which storage backend the server uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// Process-local in-memory stores.
    #[default]
    Memory,
    /// `ClickHouse` tables.
    ClickHouse,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "clickhouse" => Ok(Self::ClickHouse),
            other => bail!("Unknown storage backend '{other}', expected 'memory' or 'clickhouse'"),
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// API key for the provider.
    pub api_key: String,
    /// OpenAI-compatible base URL.
    pub base_url: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl LlmConfig {
    /// Converts to backend settings, keeping provider defaults for unset values.
    #[must_use]
    pub fn backend_settings(&self) -> BackendSettings {
        let mut settings = BackendSettings::new(&self.api_key).with_timeout(self.timeout);
        if let Some(ref base_url) = self.base_url {
            settings = settings.with_base_url(base_url);
        }
        if let Some(ref model) = self.model {
            settings = settings.with_model(model);
        }
        settings
    }
}

/// Server configuration.
///
/// Configuration values can be set via environment variables (a `.env` file
/// is loaded first when present):
/// - `TRIAGE_HOST`: The host address to bind to (default: "0.0.0.0")
/// - `TRIAGE_PORT`: The port to listen on (default: 8080)
/// - `TRIAGE_STORAGE`: `memory` or `clickhouse` (default: memory)
/// - `GROQ_API_KEY` or `TRIAGE_LLM_API_KEY`: enables AI analysis
/// - `TRIAGE_LLM_BASE_URL`, `TRIAGE_LLM_MODEL`: provider overrides
/// - `TRIAGE_LLM_TIMEOUT_SECS`: LLM request timeout (default: 30)
/// - `TRIAGE_SERVICE_IDS`: numeric service ids to register at startup, as
///   comma-separated `name=id` pairs (e.g. `checkout=1,auth=2`)
#[derive(Debug, Clone)]
pub struct Config {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Storage backend.
    pub storage: StorageBackend,
    /// LLM settings, `None` when no API key is configured.
    pub llm: Option<LlmConfig>,
    /// Service ids registered at startup.
    pub service_ids: Vec<(String, u64)>,
}

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 30;

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parses `name=id` pairs separated by commas. Empty entries are skipped.
fn parse_service_ids(raw: &str) -> Result<Vec<(String, u64)>> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, id) = entry
                .split_once('=')
                .with_context(|| format!("Service id entry '{entry}' must look like name=id"))?;
            let name = name.trim();
            if name.is_empty() {
                bail!("Service id entry '{entry}' has an empty service name");
            }
            let id = id
                .trim()
                .parse::<u64>()
                .with_context(|| format!("Service id for '{name}' must be a whole number"))?;
            Ok((name.to_string(), id))
        })
        .collect()
}

impl Config {
    /// Creates a new configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `TRIAGE_PORT` is set but cannot be parsed as a valid port number
    /// - `TRIAGE_STORAGE` names an unknown backend
    /// - `TRIAGE_LLM_TIMEOUT_SECS` is not a number
    /// - `TRIAGE_SERVICE_IDS` is not a list of `name=id` pairs
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let host = std::env::var("TRIAGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("TRIAGE_PORT")
            .ok()
            .map(|p| p.parse::<u16>())
            .transpose()
            .context("TRIAGE_PORT must be a valid port number")?
            .unwrap_or(8080);

        let storage = non_empty_var("TRIAGE_STORAGE")
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or_default();

        let timeout_secs = non_empty_var("TRIAGE_LLM_TIMEOUT_SECS")
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("TRIAGE_LLM_TIMEOUT_SECS must be a whole number of seconds")?
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        let llm = non_empty_var("TRIAGE_LLM_API_KEY")
            .or_else(|| non_empty_var("GROQ_API_KEY"))
            .map(|api_key| LlmConfig {
                api_key,
                base_url: non_empty_var("TRIAGE_LLM_BASE_URL"),
                model: non_empty_var("TRIAGE_LLM_MODEL"),
                timeout: Duration::from_secs(timeout_secs),
            });

        let service_ids = non_empty_var("TRIAGE_SERVICE_IDS")
            .map(|raw| parse_service_ids(&raw))
            .transpose()
            .context("TRIAGE_SERVICE_IDS is malformed")?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            storage,
            llm,
            service_ids,
        })
    }

    /// Returns the socket address for binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the host and port combination is not a valid
    /// socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid socket address {}:{}", self.host, self.port))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            storage: StorageBackend::Memory,
            llm: None,
            service_ids: Vec::new(),
        }
    }
}
