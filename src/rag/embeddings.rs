//! Embedding providers.
//!
//! One embedding provider is configured per deployment and its
//! [`provider_id`](EmbeddingProvider::provider_id) is recorded in the index,
//! so vectors from different models never end up side by side.

use crate::llm::client::{http_client, join_url, send_json};
use crate::llm::credential::Credential;
use crate::llm::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default OpenAI embedding model.
pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
/// Default Ollama embedding model.
pub const DEFAULT_OLLAMA_MODEL: &str = "nomic-embed-text";
/// Default number of texts sent per request.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Maps text to fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identity of the vector space, `"<type>:<model>"`.
    fn provider_id(&self) -> &str;

    /// Embed texts, returning one vector per input in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        match vectors.pop() {
            Some(vector) if vectors.is_empty() => Ok(vector),
            _ => Err(ProviderError::MalformedResponse(
                "Expected exactly one embedding".to_string(),
            )),
        }
    }
}

/// Connection settings shared by the embedding adapters.
#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    /// Model identifier.
    pub model: String,
    /// API base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Texts per request.
    pub batch_size: usize,
}

fn check_count(expected: usize, vectors: &[Vec<f32>]) -> Result<(), ProviderError> {
    if vectors.len() != expected {
        return Err(ProviderError::MalformedResponse(format!(
            "Expected {} embeddings, got {}",
            expected,
            vectors.len()
        )));
    }
    Ok(())
}

// ============================================================================
// OpenAI
// ============================================================================

/// OpenAI `/embeddings` adapter.
pub struct OpenAIEmbedder {
    http: reqwest::Client,
    api_key: Credential,
    settings: EmbeddingSettings,
    provider_id: String,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    /// Create an adapter for `settings.model`.
    pub fn new(settings: EmbeddingSettings, api_key: Credential) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            api_key,
            provider_id: format!("openai:{}", settings.model),
            settings,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = join_url(&self.settings.base_url, "embeddings");
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.settings.batch_size.max(1)) {
            let request = self
                .http
                .post(&url)
                .bearer_auth(self.api_key.expose())
                .json(&OpenAIEmbeddingRequest {
                    model: &self.settings.model,
                    input: batch,
                });
            let mut response: OpenAIEmbeddingResponse = send_json(request).await?;
            response.data.sort_by_key(|d| d.index);

            let batch_vectors: Vec<Vec<f32>> =
                response.data.into_iter().map(|d| d.embedding).collect();
            check_count(batch.len(), &batch_vectors)?;
            vectors.extend(batch_vectors);
        }

        debug!(provider = %self.provider_id, count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama `/api/embed` adapter. Needs no credential.
pub struct OllamaEmbedder {
    http: reqwest::Client,
    settings: EmbeddingSettings,
    provider_id: String,
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Create an adapter for `settings.model`.
    pub fn new(settings: EmbeddingSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            provider_id: format!("ollama:{}", settings.model),
            settings,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let url = join_url(&self.settings.base_url, "api/embed");
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.settings.batch_size.max(1)) {
            let request = self.http.post(&url).json(&OllamaEmbedRequest {
                model: &self.settings.model,
                input: batch,
            });
            let response: OllamaEmbedResponse = send_json(request).await?;
            check_count(batch.len(), &response.embeddings)?;
            vectors.extend(response.embeddings);
        }

        debug!(provider = %self.provider_id, count = vectors.len(), "Embedded texts");
        Ok(vectors)
    }
}
