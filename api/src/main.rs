//! Triage API Server Binary
//!
//! Entry point for the Triage incident analysis API server.

#![deny(unsafe_code)]

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TRIAGE_LOG_FORMAT").is_ok_and(|format| format == "json");

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    api::run_server().await
}
