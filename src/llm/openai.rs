//! OpenAI Chat Completions client.
//!
//! Works with the OpenAI API and compatible endpoints (Azure OpenAI,
//! OpenRouter, vLLM) by pointing `base_url` elsewhere.

use crate::llm::client::{
    http_client, send_json, Generation, GenerationProvider, GenerationSettings,
};
use crate::llm::credential::Credential;
use crate::llm::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI chat client.
pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: Credential,
    settings: GenerationSettings,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAIClient {
    /// Create a client for `settings.model` authenticated with `api_key`.
    pub fn new(settings: GenerationSettings, api_key: Credential) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(settings.timeout)?,
            api_key,
            settings,
        })
    }
}

#[async_trait]
impl GenerationProvider for OpenAIClient {
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
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let request = self
            .http
            .post(self.settings.endpoint("chat/completions"))
            .bearer_auth(self.api_key.expose())
            .json(&body);
        let response: ChatResponse = send_json(request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("No response from OpenAI".to_string()))?;

        Ok(Generation {
            response_text: text,
            model_id: response.model.unwrap_or_else(|| self.settings.model.clone()),
        })
    }
}
