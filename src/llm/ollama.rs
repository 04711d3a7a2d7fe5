//! Ollama local inference client.
//!
//! Talks to `/api/chat` with streaming disabled. Ollama needs no credential,
//! so an Ollama provider is always part of the failover chain.

use crate::llm::client::{
    http_client, send_json, Generation, GenerationProvider, GenerationSettings,
};
use crate::llm::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default server URL.
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "llama3.2";

/// Ollama chat client.
pub struct OllamaClient {
    http: reqwest::Client,
    settings: GenerationSettings,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OllamaClient {
    /// Create a client for `settings.model` on `settings.base_url`.
    pub fn new(settings: GenerationSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            settings,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaClient {
    fn provider_id(&self) -> &str {
        &self.settings.name
    }

    fn model_id(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, query: &str, context: &str) -> Result<Generation, ProviderError> {
        let system = self.settings.prompt.render(context);
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: query,
                },
            ],
            stream: false,
            options: Options {
                temperature: self.settings.temperature,
                num_predict: self.settings.max_tokens,
            },
        };

        let request = self.http.post(self.settings.endpoint("api/chat")).json(&body);
        let response: ChatResponse = send_json(request).await?;

        let message = response
            .message
            .ok_or_else(|| ProviderError::MalformedResponse("No message in Ollama response".to_string()))?;

        Ok(Generation {
            response_text: message.content,
            model_id: response.model.unwrap_or_else(|| self.settings.model.clone()),
        })
    }
}
