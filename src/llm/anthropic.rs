//! Anthropic Claude Messages API client.

use crate::llm::client::{
    http_client, send_json, Generation, GenerationProvider, GenerationSettings,
};
use crate::llm::credential::Credential;
use crate::llm::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// Default model.
pub const DEFAULT_MODEL: &str = "claude-3-sonnet-20240229";
/// API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Anthropic Claude client for API-based inference
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: Credential,
    settings: GenerationSettings,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    ///
    /// # Arguments
    ///
    /// * `settings` - Provider name, model and endpoint
    /// * `api_key` - Anthropic API key
    pub fn new(settings: GenerationSettings, api_key: Credential) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            api_key,
            settings,
        })
    }
}

#[async_trait]
impl GenerationProvider for AnthropicClient {
    fn provider_id(&self) -> &str {
        &self.settings.name
    }

    fn model_id(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, query: &str, context: &str) -> Result<Generation, ProviderError> {
        let system = self.settings.prompt.render(context);
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            system: &system,
            messages: vec![Message {
                role: "user",
                content: query,
            }],
        };

        let request = self
            .http
            .post(self.settings.endpoint("v1/messages"))
            .header("x-api-key", self.api_key.expose())
            .header("anthropic-version", API_VERSION)
            .json(&body);
        let response: MessagesResponse = send_json(request).await?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "No text content in Anthropic response".to_string(),
            ));
        }

        Ok(Generation {
            response_text: text,
            model_id: response.model.unwrap_or_else(|| self.settings.model.clone()),
        })
    }
}
