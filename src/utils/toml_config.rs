//! TOML-based configuration for VIA
//!
//! Everything the assistant needs at startup lives in one TOML file
//! (`via.toml`): where the index is stored, chunking and retrieval settings,
//! the embedding provider, and the ordered list of answer providers that
//! make up the failover chain. Every field has a default, so an empty file
//! (or no file at all) is a valid configuration.
//!
//! Credentials are never stored here. Providers name the environment
//! variable that holds their key (`api_key_env`); values are resolved at
//! startup after `.env` has been loaded.

use crate::llm::provider_registry::ProviderRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use via_index::DistanceMetric;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "via.toml";

/// Root configuration structure loaded from via.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViaConfig {
    /// Vector index location and metric.
    #[serde(default)]
    pub index: IndexConfig,

    /// Chunking and retrieval.
    #[serde(default)]
    pub rag: RagConfig,

    /// The single embedding provider.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Cooldown and attempt timeout.
    #[serde(default)]
    pub failover: FailoverSettings,

    /// Answer providers in priority order.
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Log level and format.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ViaConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            rag: RagConfig::default(),
            embedding: EmbeddingConfig::default(),
            failover: FailoverSettings::default(),
            providers: default_providers(),
            logging: LoggingConfig::default(),
        }
    }
}

// ============= Index Configuration =============

/// `[index]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Path of the persisted index file.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,

    /// Distance metric for new indexes.
    #[serde(default)]
    pub metric: DistanceMetric,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/via-index.json")
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            metric: DistanceMetric::default(),
        }
    }
}

// ============= RAG Configuration =============

/// `[rag]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Chunk window length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per query.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Number of retrieved chunks placed in the prompt.
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,

    /// Query embedding cache entries, 0 disables the cache.
    #[serde(default = "default_query_cache_size")]
    pub query_cache_size: usize,

    /// Custom system prompt with a `{context}` placeholder.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    3
}

fn default_max_context_chunks() -> usize {
    3
}

fn default_query_cache_size() -> usize {
    256
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            max_context_chunks: default_max_context_chunks(),
            query_cache_size: default_query_cache_size(),
            system_prompt: None,
        }
    }
}

// ============= Embedding Configuration =============

/// `[embedding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider type (`openai`, `ollama`).
    #[serde(rename = "type", default = "default_embedding_type")]
    pub provider_type: String,

    /// Model; the provider type's default when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Texts per embedding request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_type() -> String {
    "openai".to_string()
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider_type: default_embedding_type(),
            model: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: default_embedding_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============= Failover Configuration =============

/// `[failover]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverSettings {
    /// Seconds a failed provider is skipped.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Upper bound on one generation attempt, in seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

// ============= Provider Configuration =============

/// One `[[providers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique name, reported as the answering provider.
    pub name: String,

    /// Provider type (`openai`, `anthropic`, `google`, `ollama`).
    #[serde(rename = "type")]
    pub provider_type: String,

    /// Model; the provider type's default when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Environment variable holding the API key; the type's default when unset.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// API base URL override.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Request timeout in seconds; `[failover] attempt_timeout_secs` when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Upper bound on generated tokens.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

impl ProviderConfig {
    /// Entry of `provider_type` named after the type, all else default.
    pub fn named(provider_type: &str) -> Self {
        Self {
            name: provider_type.to_string(),
            provider_type: provider_type.to_string(),
            model: None,
            api_key_env: None,
            base_url: None,
            timeout_secs: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_providers() -> Vec<ProviderConfig> {
    ["openai", "anthropic", "google"]
        .into_iter()
        .map(ProviderConfig::named)
        .collect()
}

// ============= Logging Configuration =============

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Loading and Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file does not exist
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The config file exists but could not be read
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// The file is not valid TOML or does not match the schema
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Values parsed but are inconsistent
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl ViaConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ViaConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));

        if self.rag.chunk_size == 0 {
            return invalid("rag.chunk_size must be greater than 0".to_string());
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return invalid(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            ));
        }
        if self.rag.top_k == 0 {
            return invalid("rag.top_k must be at least 1".to_string());
        }
        if self.rag.max_context_chunks == 0 {
            return invalid("rag.max_context_chunks must be at least 1".to_string());
        }

        let registry = ProviderRegistry::builtin();

        if !registry.has_embedding(&self.embedding.provider_type) {
            return invalid(format!(
                "Unknown embedding provider type '{}' (expected one of: {})",
                self.embedding.provider_type,
                registry.embedding_types().join(", ")
            ));
        }
        if self.embedding.timeout_secs == 0 {
            return invalid("embedding.timeout_secs must be greater than 0".to_string());
        }
        if self.embedding.batch_size == 0 {
            return invalid("embedding.batch_size must be greater than 0".to_string());
        }
        if self.failover.attempt_timeout_secs == 0 {
            return invalid("failover.attempt_timeout_secs must be greater than 0".to_string());
        }

        let mut names = HashSet::new();
        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return invalid("Provider names must not be empty".to_string());
            }
            if !names.insert(provider.name.as_str()) {
                return invalid(format!("Duplicate provider name '{}'", provider.name));
            }
            if !registry.has_generation(&provider.provider_type) {
                return invalid(format!(
                    "Unknown provider type '{}' for provider '{}' (expected one of: {})",
                    provider.provider_type,
                    provider.name,
                    registry.generation_types().join(", ")
                ));
            }
            if provider.timeout_secs == Some(0) {
                return invalid(format!(
                    "providers.timeout_secs for '{}' must be greater than 0",
                    provider.name
                ));
            }
        }

        Ok(())
    }

    /// Cooldown applied to failed providers.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.failover.cooldown_secs)
    }

    /// Upper bound on one generation attempt.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.failover.attempt_timeout_secs)
    }

    /// Get a provider entry by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

/// Commented configuration template written by `via init`.
pub const CONFIG_TEMPLATE: &str = r#"# VIA configuration
#
# API keys are read from the environment (or a .env file next to this one).
# Only the *name* of each variable is stored here.

[index]
path = "data/via-index.json"
metric = "cosine"                 # cosine | euclidean | dot_product

[rag]
chunk_size = 1000                 # characters per chunk
chunk_overlap = 200               # must be smaller than chunk_size
top_k = 3                         # chunks retrieved per question
max_context_chunks = 3            # chunks placed in the prompt
query_cache_size = 256            # 0 disables the query embedding cache
# system_prompt = "Answer from the policy excerpts below.\n\n{context}"

# One embedding provider per deployment. Changing it requires rebuilding
# the index.
[embedding]
type = "openai"                   # openai | ollama
model = "text-embedding-3-small"
api_key_env = "OPENAI_API_KEY"
timeout_secs = 30
batch_size = 64

[failover]
cooldown_secs = 60
attempt_timeout_secs = 60

# Answer providers, tried in this order. Providers whose key is missing
# are left out of the chain.
[[providers]]
name = "openai"
type = "openai"
model = "gpt-3.5-turbo"
api_key_env = "OPENAI_API_KEY"

[[providers]]
name = "anthropic"
type = "anthropic"
model = "claude-3-sonnet-20240229"
api_key_env = "ANTHROPIC_API_KEY"

[[providers]]
name = "google"
type = "google"
model = "gemini-pro"
api_key_env = "GOOGLE_API_KEY"

# [[providers]]
# name = "local"
# type = "ollama"
# model = "llama3.2"
# base_url = "http://localhost:11434"

[logging]
level = "info"                    # RUST_LOG overrides this
format = "pretty"                 # pretty | json
"#;
