//! Google Gemini `generateContent` client.

use crate::llm::client::{
    http_client, send_json, Generation, GenerationProvider, GenerationSettings,
};
use crate::llm::credential::Credential;
use crate::llm::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Gemini client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Credential,
    settings: GenerationSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
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
impl GenerationProvider for GeminiClient {
    fn provider_id(&self) -> &str {
        &self.settings.name
    }

    fn model_id(&self) -> &str {
        &self.settings.model
    }

    async fn generate(&self, query: &str, context: &str) -> Result<Generation, ProviderError> {
        let system = self.settings.prompt.render(context);
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: &system }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: query }],
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        };

        let path = format!("models/{}:generateContent", self.settings.model);
        let request = self
            .http
            .post(self.settings.endpoint(&path))
            .header("x-goog-api-key", self.api_key.expose())
            .json(&body);
        let response: GenerateResponse = send_json(request).await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "No candidates in Gemini response".to_string(),
            ));
        }

        Ok(Generation {
            response_text: text,
            model_id: response
                .model_version
                .unwrap_or_else(|| self.settings.model.clone()),
        })
    }
}
