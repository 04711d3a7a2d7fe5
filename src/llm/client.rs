//! Generation provider abstraction
//!
//! Every LLM backend implements [`GenerationProvider`]: one question plus the
//! assembled policy context in, one answer out. Backends differ only in wire
//! format; failures are mapped into [`ProviderError`] at the adapter boundary
//! so the failover controller never sees backend-specific error shapes.

use crate::llm::error::ProviderError;
use crate::llm::prompt::PromptTemplate;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default per-request timeout for provider HTTP calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A generated answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// The answer text.
    pub response_text: String,
    /// Model that produced it.
    pub model_id: String,
}

/// A backend that answers questions from supplied context.
///
/// Implementations hold no pipeline state. Every failure must be classified
/// as a [`ProviderError`].
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Configured name of this provider, unique within a deployment.
    fn provider_id(&self) -> &str;

    /// Model used for generation.
    fn model_id(&self) -> &str;

    /// Answer `query` using `context` as grounding.
    async fn generate(&self, query: &str, context: &str) -> Result<Generation, ProviderError>;
}

/// Settings shared by every generation adapter.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Configured provider name.
    pub name: String,
    /// Model identifier sent to the backend.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
    /// System prompt template.
    pub prompt: PromptTemplate,
}

impl GenerationSettings {
    /// Settings with defaults for everything but identity and endpoint.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            temperature: 0.7,
            max_tokens: 1000,
            prompt: PromptTemplate::default(),
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the prompt template.
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Full URL of `path` under `base_url`.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Build the HTTP client used by one adapter.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::invalid_request(format!("Failed to build HTTP client: {}", e)))
}

/// Send a prepared request and decode a JSON success body.
///
/// Non-success statuses are classified with [`ProviderError::from_http`],
/// transport errors with [`ProviderError::from_reqwest`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(ProviderError::from_reqwest)?;
    let status = response.status();
    let body = response.text().await.map_err(ProviderError::from_reqwest)?;

    if !status.is_success() {
        debug!(status = status.as_u16(), "Provider returned error status");
        return Err(ProviderError::from_http(status.as_u16(), &body));
    }

    serde_json::from_str(&body)
        .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))
}
