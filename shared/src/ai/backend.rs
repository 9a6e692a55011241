//! Text-generation backends.
//!
//! [`TextGenerator`] is the seam between the analyzer and the LLM provider.
//! [`ChatCompletionsBackend`] talks to any OpenAI-compatible chat completions
//! endpoint; Groq is the default provider.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Default OpenAI-compatible base URL (Groq).
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Default model name.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced by a text-generation backend.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The HTTP request could not be sent or completed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider answered with an error.
    #[error("Backend error: {0}")]
    BackendError(String),

    /// The provider answer could not be understood.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No answer arrived in time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

/// Boxed future returned by [`TextGenerator::generate`].
pub type GenerateFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

/// A collaborator that turns a prompt into free text.
pub trait TextGenerator: Send + Sync {
    /// Generates a completion for `prompt`.
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
}

/// Connection settings for [`ChatCompletionsBackend`].
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Bearer token sent to the provider.
    pub api_key: String,
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BackendSettings {
    /// Creates settings for the default provider and model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatError {
    message: String,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// OpenAI-compatible chat completions client.
pub struct ChatCompletionsBackend {
    client: Client,
    settings: BackendSettings,
}

impl std::fmt::Debug for ChatCompletionsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsBackend")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

impl ChatCompletionsBackend {
    /// Creates a backend from the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: BackendSettings) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GenerationError::HttpError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, settings })
    }

    /// Returns the model this backend sends requests for.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn api_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }
}

impl TextGenerator for ChatCompletionsBackend {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            let request = ChatRequest {
                model: &self.settings.model,
                messages: vec![ChatMessage {
                    role: "user",
                    content: prompt,
                }],
                temperature: self.settings.temperature,
            };

            let response = self
                .client
                .post(self.api_url())
                .bearer_auth(&self.settings.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        GenerationError::Timeout(self.settings.timeout)
                    } else {
                        GenerationError::HttpError(format!("HTTP request failed: {e}"))
                    }
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(GenerationError::BackendError(format!(
                    "API returned error {status}: {error_text}"
                )));
            }

            let body: ChatResponse = response.json().await.map_err(|e| {
                GenerationError::InvalidResponse(format!("Failed to parse chat response: {e}"))
            })?;

            if let Some(error) = body.error {
                return Err(GenerationError::BackendError(format!(
                    "API error ({}): {}",
                    error.error_type.unwrap_or_else(|| "unknown".to_string()),
                    error.message
                )));
            }

            body.choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| {
                    GenerationError::InvalidResponse("No content in chat response".to_string())
                })
        })
    }
}

/// Extracts the JSON object from a model answer.
///
/// Models sometimes wrap JSON in markdown fences or surround it with prose.
/// Falls back to the trimmed input when no object is found.
#[must_use]
pub fn extract_json(text: &str) -> &str {
    let text = text.trim();

    if let Some(start) = text.find("```json") {
        let body = &text[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        if let Some(end) = body.find("```") {
            let candidate = body[..end].trim();
            if candidate.starts_with('{') && candidate.ends_with('}') {
                return candidate;
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }

    text
}
