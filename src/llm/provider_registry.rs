//! Provider Registry
//!
//! A table of provider types (`openai`, `anthropic`, `google`, `ollama`)
//! and how to build each one. Configuration entries are resolved against the
//! table, so adding a backend means registering one more entry rather than
//! branching on type strings at call sites.
//!
//! ```rust,ignore
//! let registry = ProviderRegistry::builtin();
//! let chain = registry.build_chain(&config)?;       // Vec<Arc<dyn GenerationProvider>>
//! let embedder = registry.build_embedder(&config)?; // Arc<dyn EmbeddingProvider>
//! ```

use crate::llm::anthropic::{self, AnthropicClient};
use crate::llm::client::{GenerationProvider, GenerationSettings};
use crate::llm::credential::Credential;
use crate::llm::error::{FailureKind, ProviderError};
use crate::llm::google::{self, GeminiClient};
use crate::llm::ollama::{self, OllamaClient};
use crate::llm::openai::{self, OpenAIClient};
use crate::llm::prompt::PromptTemplate;
use crate::rag::embeddings::{
    EmbeddingProvider, EmbeddingSettings, OllamaEmbedder, OpenAIEmbedder, DEFAULT_OLLAMA_MODEL,
    DEFAULT_OPENAI_MODEL,
};
use crate::utils::toml_config::{ProviderConfig, ViaConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Builds a generation provider from resolved settings.
pub type GenerationBuilder =
    fn(GenerationSettings, Option<Credential>) -> Result<Arc<dyn GenerationProvider>, ProviderError>;

/// Builds an embedding provider from resolved settings.
pub type EmbeddingBuilder =
    fn(EmbeddingSettings, Option<Credential>) -> Result<Arc<dyn EmbeddingProvider>, ProviderError>;

/// Defaults and constructor for one provider type.
#[derive(Clone, Copy)]
pub struct ProviderKind<B> {
    /// Model used when the entry names none.
    pub default_model: &'static str,
    /// Endpoint used when the entry names none.
    pub default_base_url: &'static str,
    /// Credential variable used when the entry names none. `None` means the
    /// type needs no credential.
    pub default_api_key_env: Option<&'static str>,
    /// Constructor.
    pub build: B,
}

/// Errors raised while turning configuration into providers.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// No builder registered for the type.
    #[error("Unknown {role} provider type '{provider_type}'")]
    UnknownType {
        /// `generation` or `embedding`.
        role: &'static str,
        /// The unknown type.
        provider_type: String,
    },

    /// The embedding provider's credential is missing or a placeholder.
    #[error("Embedding provider '{provider_type}' needs a valid API key in ${env}")]
    MissingCredential {
        /// Embedding provider type.
        provider_type: String,
        /// Variable that was checked.
        env: String,
    },

    /// The adapter could not be constructed.
    #[error("Failed to build provider '{name}': {source}")]
    Build {
        /// Provider entry name.
        name: String,
        /// Underlying error.
        #[source]
        source: ProviderError,
    },
}

/// How one `[[providers]]` entry resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPlan {
    /// Entry name.
    pub name: String,
    /// Provider type.
    pub provider_type: String,
    /// Resolved model.
    pub model: String,
    /// Credential variable, if the type needs one.
    pub api_key_env: Option<String>,
    /// Whether the provider joins the failover chain.
    pub enabled: bool,
}

/// Registry of provider types.
pub struct ProviderRegistry {
    generation: BTreeMap<&'static str, ProviderKind<GenerationBuilder>>,
    embedding: BTreeMap<&'static str, ProviderKind<EmbeddingBuilder>>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            generation: BTreeMap::new(),
            embedding: BTreeMap::new(),
        }
    }

    /// Registry with every built-in adapter.
    pub fn builtin() -> Self {
        let mut registry = Self::new();

        registry.register_generation(
            "openai",
            ProviderKind {
                default_model: openai::DEFAULT_MODEL,
                default_base_url: openai::DEFAULT_BASE_URL,
                default_api_key_env: Some("OPENAI_API_KEY"),
                build: build_openai,
            },
        );
        registry.register_generation(
            "anthropic",
            ProviderKind {
                default_model: anthropic::DEFAULT_MODEL,
                default_base_url: anthropic::DEFAULT_BASE_URL,
                default_api_key_env: Some("ANTHROPIC_API_KEY"),
                build: build_anthropic,
            },
        );
        registry.register_generation(
            "google",
            ProviderKind {
                default_model: google::DEFAULT_MODEL,
                default_base_url: google::DEFAULT_BASE_URL,
                default_api_key_env: Some("GOOGLE_API_KEY"),
                build: build_google,
            },
        );
        registry.register_generation(
            "ollama",
            ProviderKind {
                default_model: ollama::DEFAULT_MODEL,
                default_base_url: ollama::DEFAULT_BASE_URL,
                default_api_key_env: None,
                build: build_ollama,
            },
        );

        registry.register_embedding(
            "openai",
            ProviderKind {
                default_model: DEFAULT_OPENAI_MODEL,
                default_base_url: openai::DEFAULT_BASE_URL,
                default_api_key_env: Some("OPENAI_API_KEY"),
                build: build_openai_embedder,
            },
        );
        registry.register_embedding(
            "ollama",
            ProviderKind {
                default_model: DEFAULT_OLLAMA_MODEL,
                default_base_url: ollama::DEFAULT_BASE_URL,
                default_api_key_env: None,
                build: build_ollama_embedder,
            },
        );

        registry
    }

    /// Register (or replace) a generation provider type.
    pub fn register_generation(
        &mut self,
        provider_type: &'static str,
        kind: ProviderKind<GenerationBuilder>,
    ) {
        self.generation.insert(provider_type, kind);
    }

    /// Register (or replace) an embedding provider type.
    pub fn register_embedding(
        &mut self,
        provider_type: &'static str,
        kind: ProviderKind<EmbeddingBuilder>,
    ) {
        self.embedding.insert(provider_type, kind);
    }

    /// Whether `provider_type` can generate answers.
    pub fn has_generation(&self, provider_type: &str) -> bool {
        self.generation.contains_key(provider_type)
    }

    /// Whether `provider_type` can embed text.
    pub fn has_embedding(&self, provider_type: &str) -> bool {
        self.embedding.contains_key(provider_type)
    }

    /// Registered generation types, sorted.
    pub fn generation_types(&self) -> Vec<&'static str> {
        self.generation.keys().copied().collect()
    }

    /// Registered embedding types, sorted.
    pub fn embedding_types(&self) -> Vec<&'static str> {
        self.embedding.keys().copied().collect()
    }

    /// Resolve every `[[providers]]` entry without building anything.
    pub fn plan(&self, config: &ViaConfig) -> Result<Vec<ProviderPlan>, RegistryError> {
        config
            .providers
            .iter()
            .map(|entry| {
                let kind = self.generation_kind(entry)?;
                let api_key_env = resolve_key_env(entry.api_key_env.as_deref(), kind.default_api_key_env);
                let enabled = api_key_env
                    .as_deref()
                    .map_or(true, |env| Credential::from_env(env).is_some());
                Ok(ProviderPlan {
                    name: entry.name.clone(),
                    provider_type: entry.provider_type.clone(),
                    model: entry
                        .model
                        .clone()
                        .unwrap_or_else(|| kind.default_model.to_string()),
                    api_key_env,
                    enabled,
                })
            })
            .collect()
    }

    /// Build the failover chain in configured order.
    ///
    /// Entries whose credential is missing or a placeholder are left out
    /// with a warning; they never enter the failover state machine.
    pub fn build_chain(
        &self,
        config: &ViaConfig,
    ) -> Result<Vec<Arc<dyn GenerationProvider>>, RegistryError> {
        let prompt = config
            .rag
            .system_prompt
            .as_deref()
            .map(PromptTemplate::new)
            .unwrap_or_default();

        let mut chain = Vec::new();
        for entry in &config.providers {
            let kind = self.generation_kind(entry)?;
            let api_key_env = resolve_key_env(entry.api_key_env.as_deref(), kind.default_api_key_env);

            let credential = match &api_key_env {
                Some(env) => match Credential::from_env(env) {
                    Some(credential) => Some(credential),
                    None => {
                        warn!(
                            provider = %entry.name,
                            env = %env,
                            "No valid API key found, provider excluded from failover chain"
                        );
                        continue;
                    }
                },
                None => None,
            };

            let mut settings = GenerationSettings::new(
                entry.name.clone(),
                entry
                    .model
                    .clone()
                    .unwrap_or_else(|| kind.default_model.to_string()),
                entry
                    .base_url
                    .clone()
                    .unwrap_or_else(|| kind.default_base_url.to_string()),
            )
            .with_timeout(
                entry
                    .timeout_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| config.attempt_timeout()),
            )
            .with_prompt(prompt.clone());
            settings.temperature = entry.temperature;
            settings.max_tokens = entry.max_tokens;

            let provider = (kind.build)(settings, credential).map_err(|source| RegistryError::Build {
                name: entry.name.clone(),
                source,
            })?;
            info!(provider = %entry.name, model = provider.model_id(), "Provider enabled");
            chain.push(provider);
        }

        if chain.is_empty() {
            warn!("No answer provider has a valid credential; queries will report unavailable");
        }
        Ok(chain)
    }

    /// Build the configured embedding provider.
    pub fn build_embedder(
        &self,
        config: &ViaConfig,
    ) -> Result<Arc<dyn EmbeddingProvider>, RegistryError> {
        let entry = &config.embedding;
        let kind = self
            .embedding
            .get(entry.provider_type.as_str())
            .ok_or_else(|| RegistryError::UnknownType {
                role: "embedding",
                provider_type: entry.provider_type.clone(),
            })?;

        let credential = match resolve_key_env(entry.api_key_env.as_deref(), kind.default_api_key_env) {
            Some(env) => Some(Credential::from_env(&env).ok_or_else(|| {
                RegistryError::MissingCredential {
                    provider_type: entry.provider_type.clone(),
                    env: env.clone(),
                }
            })?),
            None => None,
        };

        let settings = EmbeddingSettings {
            model: entry
                .model
                .clone()
                .unwrap_or_else(|| kind.default_model.to_string()),
            base_url: entry
                .base_url
                .clone()
                .unwrap_or_else(|| kind.default_base_url.to_string()),
            timeout: entry.timeout(),
            batch_size: entry.batch_size,
        };

        (kind.build)(settings, credential).map_err(|source| RegistryError::Build {
            name: format!("embedding:{}", entry.provider_type),
            source,
        })
    }

    fn generation_kind(
        &self,
        entry: &ProviderConfig,
    ) -> Result<&ProviderKind<GenerationBuilder>, RegistryError> {
        self.generation
            .get(entry.provider_type.as_str())
            .ok_or_else(|| RegistryError::UnknownType {
                role: "generation",
                provider_type: entry.provider_type.clone(),
            })
    }
}

/// Configured credential variable, else the type's default.
fn resolve_key_env(configured: Option<&str>, default: Option<&'static str>) -> Option<String> {
    configured.map(str::to_string).or(default.map(str::to_string))
}

fn require(credential: Option<Credential>) -> Result<Credential, ProviderError> {
    credential.ok_or_else(|| ProviderError::failure(FailureKind::InvalidCredential, "missing API key"))
}

fn build_openai(
    settings: GenerationSettings,
    key: Option<Credential>,
) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
    Ok(Arc::new(OpenAIClient::new(settings, require(key)?)?))
}

fn build_anthropic(
    settings: GenerationSettings,
    key: Option<Credential>,
) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
    Ok(Arc::new(AnthropicClient::new(settings, require(key)?)?))
}

fn build_google(
    settings: GenerationSettings,
    key: Option<Credential>,
) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
    Ok(Arc::new(GeminiClient::new(settings, require(key)?)?))
}

fn build_ollama(
    settings: GenerationSettings,
    _key: Option<Credential>,
) -> Result<Arc<dyn GenerationProvider>, ProviderError> {
    Ok(Arc::new(OllamaClient::new(settings)?))
}

fn build_openai_embedder(
    settings: EmbeddingSettings,
    key: Option<Credential>,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    Ok(Arc::new(OpenAIEmbedder::new(settings, require(key)?)?))
}

fn build_ollama_embedder(
    settings: EmbeddingSettings,
    _key: Option<Credential>,
) -> Result<Arc<dyn EmbeddingProvider>, ProviderError> {
    Ok(Arc::new(OllamaEmbedder::new(settings)?))
}
