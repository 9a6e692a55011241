//! Triage API Server
//!
//! This crate provides the HTTP server for the Triage incident analysis
//! platform. It ingests telemetry (logs, metrics, traces, events), answers
//! filtered queries and serves the dashboard views: service health, critical
//! services, correlation analysis and incident trends.
//!
//! # Architecture
//!
//! The API server is built on Axum and Tokio, providing:
//! - REST API for telemetry ingestion and querying
//! - Statistics endpoints over stored telemetry
//! - Dashboard endpoints backed by [`shared::dashboard::DashboardService`]
//!
//! # Example
//!
//! ```no_run
//! use api::run_server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     run_server().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod config;
pub mod db;
mod routes;
pub mod state;

pub use config::{Config, LlmConfig, StorageBackend};
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use shared::ai::{ChatCompletionsBackend, RootCauseAnalyzer, TextGenerator};
use shared::storage::TelemetryStores;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Largest accepted request body (batch ingestion included).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Runs the Triage API server.
///
/// This function initializes the server with configuration from environment variables
/// and starts listening for incoming connections. It handles graceful shutdown on
/// SIGTERM/SIGINT signals.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration cannot be loaded from environment
/// - The server fails to bind to the configured address
/// - A fatal error occurs during operation
pub async fn run_server() -> Result<()> {
    let config = Config::from_env()?;
    run_server_with_config(config).await
}

/// Runs the Triage API server with the provided configuration.
///
/// # Errors
///
/// Returns an error if:
/// - The configured address is invalid or cannot be bound
/// - The `ClickHouse` backend is selected but unreachable
/// - The LLM client cannot be constructed
/// - A fatal error occurs during operation
pub async fn run_server_with_config(config: Config) -> Result<()> {
    let addr = config.socket_addr()?;

    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = ?config.storage,
        "Triage API server starting"
    );

    let stores = build_stores(config.storage).await?;
    seed_registry(&stores, &config.service_ids)?;
    let analyzer = build_analyzer(&config)?;
    let app = create_router(AppState::new(stores, analyzer));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(%addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn build_stores(backend: StorageBackend) -> Result<TelemetryStores> {
    match backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory telemetry stores");
            Ok(TelemetryStores::in_memory())
        }
        StorageBackend::ClickHouse => {
            let db_config = db::DatabaseConfig::from_env();
            let database = db::Database::new(&db_config);
            database
                .ping()
                .await
                .context("ClickHouse is not reachable")?;
            tracing::info!(
                url = %db_config.url,
                database = %db_config.database,
                "Connected to ClickHouse"
            );
            Ok(TelemetryStores::clickhouse(&database.client()))
        }
    }
}

fn seed_registry(stores: &TelemetryStores, service_ids: &[(String, u64)]) -> Result<()> {
    for (name, id) in service_ids {
        stores
            .registry
            .register(name, *id)
            .with_context(|| format!("Failed to register service '{name}'"))?;
    }
    if !service_ids.is_empty() {
        tracing::info!(count = service_ids.len(), "Registered configured service ids");
    }
    Ok(())
}

fn build_analyzer(config: &Config) -> Result<RootCauseAnalyzer> {
    let Some(llm) = config.llm.as_ref() else {
        tracing::warn!("No LLM API key configured, AI analysis is disabled");
        return Ok(RootCauseAnalyzer::disabled());
    };

    let backend = ChatCompletionsBackend::new(llm.backend_settings())
        .context("Failed to build LLM client")?;
    tracing::info!(model = backend.model(), "AI analysis enabled");

    let generator: Arc<dyn TextGenerator> = Arc::new(backend);
    Ok(RootCauseAnalyzer::new(Some(generator), llm.timeout))
}

/// Creates the main application router with all routes and middleware.
///
/// This function is public to allow testing the router without starting a full server.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes(state.clone()))
        .merge(routes::logs_routes(state.clone()))
        .merge(routes::metrics_routes(state.clone()))
        .merge(routes::traces_routes(state.clone()))
        .merge(routes::events_routes(state.clone()))
        .merge(routes::statistics_routes(state.clone()))
        .merge(routes::dashboard_routes(state))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
