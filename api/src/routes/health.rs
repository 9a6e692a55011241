//! Liveness endpoint for load balancers and orchestrators.
//!
//! Besides answering, it reports which storage backend the process runs on
//! and whether LLM root-cause analysis is available, so a deployment that
//! silently fell back to in-memory stores or lost its API key is visible.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use shared::storage::StorageKind;

use crate::state::AppState;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "healthy" when the process answers.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Storage backend behind the telemetry stores.
    pub storage: StorageKind,
    /// "enabled" when an LLM backend is configured, "disabled" otherwise.
    pub ai_analysis: &'static str,
}

/// Creates the liveness route.
pub fn health_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .with_state(state)
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ai_analysis = if state.dashboard().analyzer().is_configured() {
        "enabled"
    } else {
        "disabled"
    };

    Json(HealthResponse {
        status: "healthy",
        service: "triage-api",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.stores().kind,
        ai_analysis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use shared::ai::{GenerateFuture, GenerationError, RootCauseAnalyzer, TextGenerator};
    use shared::storage::TelemetryStores;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Silent;

    impl TextGenerator for Silent {
        fn generate<'a>(&'a self, _prompt: &'a str) -> GenerateFuture<'a> {
            Box::pin(async { Err(GenerationError::BackendError("offline".to_string())) })
        }
    }

    async fn health_of(state: AppState) -> serde_json::Value {
        let response = health_routes(state)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_body() {
        let health = health_of(AppState::with_in_memory_store()).await;

        assert_eq!(health["status"], "healthy");
        assert_eq!(health["service"], "triage-api");
        assert!(health["version"].is_string());
        assert_eq!(health["storage"], "memory");
        assert_eq!(health["ai_analysis"], "disabled");
    }

    #[tokio::test]
    async fn test_health_reports_configured_analyzer() {
        let generator: Arc<dyn TextGenerator> = Arc::new(Silent);
        let state = AppState::new(
            TelemetryStores::in_memory(),
            RootCauseAnalyzer::new(Some(generator), Duration::from_secs(1)),
        );

        let health = health_of(state).await;

        assert_eq!(health["ai_analysis"], "enabled");
    }
}
