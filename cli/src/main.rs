//! Triage CLI
//!
//! Command-line interface for the Triage incident analysis API.
//!
//! # Usage
//!
//! ```bash
//! triage --help
//! triage health
//! triage critical --hours 6 --limit 5
//! triage correlate --service checkout
//! ```

#![deny(unsafe_code)]

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::analysis::ServiceHealth;

/// Triage CLI - incident analysis command-line interface
#[derive(Parser)]
#[command(name = "triage")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API server URL
    #[arg(
        short,
        long,
        env = "TRIAGE_API_URL",
        default_value = "http://localhost:8080"
    )]
    api_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API server health
    Health,
    /// List every service that has reported telemetry
    Services,
    /// Show the fleet overview
    Overview {
        /// Window in hours
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },
    /// Show the health of one service
    ServiceHealth {
        /// Service name
        name: String,
        /// Window in hours
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },
    /// List degraded and critical services, worst first
    Critical {
        /// Window in hours
        #[arg(long, default_value_t = 1)]
        hours: u32,
        /// Maximum number of services
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Run the correlation engine
    Correlate {
        /// Restrict to one service
        #[arg(short, long)]
        service: Option<String>,
        /// Window in hours
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },
    /// Show hourly incident volume
    IncidentVolume {
        /// Restrict to one service
        #[arg(short, long)]
        service: Option<String>,
        /// Window in hours
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Classify the severity of the current incident picture
    Severity {
        /// Window in hours
        #[arg(long, default_value_t = 1)]
        hours: u32,
    },
}

#[derive(Deserialize)]
struct CriticalServices {
    services: Vec<ServiceHealth>,
}

fn dashboard<'a>(tail: &[&'a str]) -> Vec<&'a str> {
    let mut path = vec!["api", "v1", "dashboard"];
    path.extend_from_slice(tail);
    path
}

impl Commands {
    /// Path segments and query parameters of the API call backing this
    /// command.
    fn request(&self) -> (Vec<&str>, Vec<(&'static str, String)>) {
        let (path, mut query): (Vec<&str>, Vec<(&'static str, String)>) = match self {
            Self::Health => (vec!["health"], Vec::new()),
            Self::Services => (vec!["api", "v1", "telemetry", "services"], Vec::new()),
            Self::Overview { hours } => (
                dashboard(&["overview"]),
                vec![("hours", hours.to_string())],
            ),
            Self::ServiceHealth { name, hours } => (
                dashboard(&["services", name.as_str(), "health"]),
                vec![("hours", hours.to_string())],
            ),
            Self::Critical { hours, limit } => (
                dashboard(&["services", "critical"]),
                vec![("hours", hours.to_string()), ("limit", limit.to_string())],
            ),
            Self::Correlate { hours, .. } => (
                dashboard(&["correlation-engine"]),
                vec![("hours", hours.to_string())],
            ),
            Self::IncidentVolume { hours, .. } => (
                dashboard(&["metrics", "incident-volume"]),
                vec![("hours", hours.to_string())],
            ),
            Self::Severity { hours } => (
                dashboard(&["incident-severity"]),
                vec![("hours", hours.to_string())],
            ),
        };

        if let Self::Correlate {
            service: Some(service),
            ..
        }
        | Self::IncidentVolume {
            service: Some(service),
            ..
        } = self
        {
            query.push(("service_name", service.clone()));
        }

        (path, query)
    }

    /// Full request URL under `api_url`, with path segments and query
    /// values percent-encoded.
    fn url(&self, api_url: &str) -> Result<Url> {
        let mut url =
            Url::parse(api_url).with_context(|| format!("Invalid API URL '{api_url}'"))?;
        let (path, query) = self.request();

        url.path_segments_mut()
            .map_err(|()| anyhow!("API URL '{api_url}' cannot carry a path"))?
            .pop_if_empty()
            .extend(path);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }
}

async fn fetch<T: DeserializeOwned>(client: &reqwest::Client, url: Url) -> Result<T> {
    tracing::debug!(%url, "GET");

    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("{url} returned {status}: {body}");
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("Unexpected response from {url}"))
}

fn print_health_table(services: &[ServiceHealth]) {
    if services.is_empty() {
        println!("No services need attention");
        return;
    }

    println!(
        "{:<24} {:<9} {:>10} {:>12} {:>8}",
        "SERVICE", "STATUS", "ERROR %", "LATENCY ms", "ERRORS"
    );
    for health in services {
        println!(
            "{:<24} {:<9} {:>10.2} {:>12.2} {:>8}",
            health.service_name,
            health.status.as_str(),
            health.error_rate,
            health.avg_latency,
            health.error_count
        );
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        println!("Triage CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for usage information");
        return Ok(());
    };

    let client = reqwest::Client::new();
    let url = command.url(&cli.api_url)?;

    if let Commands::Critical { .. } = command {
        let critical: CriticalServices = fetch(&client, url).await?;
        print_health_table(&critical.services);
        return Ok(());
    }

    let body: serde_json::Value = fetch(&client, url).await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "http://localhost:8080";

    fn url_for(args: &[&str]) -> String {
        let cli = Cli::try_parse_from(args).unwrap();
        cli.command.unwrap().url(API).unwrap().to_string()
    }

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["triage"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_health_command() {
        let cli = Cli::try_parse_from(["triage", "health"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Health)));
        assert_eq!(url_for(&["triage", "health"]), "http://localhost:8080/health");
    }

    #[test]
    fn test_critical_defaults() {
        assert_eq!(
            url_for(&["triage", "critical"]),
            "http://localhost:8080/api/v1/dashboard/services/critical?hours=1&limit=10"
        );
    }

    #[test]
    fn test_correlate_with_service() {
        assert_eq!(
            url_for(&["triage", "correlate", "--service", "checkout", "--hours", "6"]),
            "http://localhost:8080/api/v1/dashboard/correlation-engine?hours=6&service_name=checkout"
        );
    }

    #[test]
    fn test_service_name_cannot_inject_query_parameters() {
        assert_eq!(
            url_for(&["triage", "correlate", "--service", "a&hours=999"]),
            "http://localhost:8080/api/v1/dashboard/correlation-engine?hours=1&service_name=a%26hours%3D999"
        );
        assert_eq!(
            url_for(&["triage", "incident-volume", "-s", "a b"]),
            "http://localhost:8080/api/v1/dashboard/metrics/incident-volume?hours=24&service_name=a+b"
        );
    }

    #[test]
    fn test_service_name_slash_stays_one_segment() {
        assert_eq!(
            url_for(&["triage", "service-health", "team/api"]),
            "http://localhost:8080/api/v1/dashboard/services/team%2Fapi/health?hours=1"
        );
    }

    #[test]
    fn test_incident_volume_defaults_to_a_day() {
        assert_eq!(
            url_for(&["triage", "incident-volume"]),
            "http://localhost:8080/api/v1/dashboard/metrics/incident-volume?hours=24"
        );
    }

    #[test]
    fn test_api_url_with_base_path() {
        let args = ["triage", "--api-url", "http://triage:9000/ops/", "services"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.api_url, "http://triage:9000/ops/");
        assert_eq!(
            cli.command.unwrap().url(&cli.api_url).unwrap().as_str(),
            "http://triage:9000/ops/api/v1/telemetry/services"
        );
    }

    #[test]
    fn test_invalid_api_url() {
        let cli = Cli::try_parse_from(["triage", "health"]).unwrap();
        assert!(cli.command.unwrap().url("not a url").is_err());
    }
}
