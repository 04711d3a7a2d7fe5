//! Answer Providers and Failover
//!
//! Everything between an assembled context and a generated answer:
//!
//! - [`GenerationProvider`] - The trait every backend adapter implements
//! - [`ProviderError`] / [`FailureKind`] - Classified backend errors
//! - [`FailoverController`] - Ordered chain with per-provider cooldown
//! - [`ProviderRegistry`] - Builds the chain and the embedder from `via.toml`
//!
//! # Supported Providers
//!
//! - `openai` - OpenAI chat completions
//! - `anthropic` - Anthropic messages API
//! - `google` - Gemini `generateContent`
//! - `ollama` - Local Ollama server, no credential needed
//!
//! # Example
//!
//! ```ignore
//! use via::llm::{FailoverConfig, FailoverController, ProviderRegistry};
//!
//! let chain = ProviderRegistry::builtin().build_chain(&config)?;
//! let controller = FailoverController::new(chain, FailoverConfig::default());
//!
//! let answer = controller.generate("Is flood damage covered?", &context).await?;
//! println!("{} ({})", answer.generation.response_text, answer.provider_id);
//! ```

pub mod anthropic;
/// Generation trait and shared HTTP plumbing.
pub mod client;
pub mod credential;
pub mod error;
pub mod failover;
pub mod google;
pub mod ollama;
pub mod openai;
pub mod prompt;
/// Provider type table and chain construction.
pub mod provider_registry;

pub use client::{Generation, GenerationProvider, GenerationSettings};
pub use credential::Credential;
pub use error::{FailureKind, ProviderError};
pub use failover::{
    FailoverAnswer, FailoverConfig, FailoverController, FailoverError, ProviderState,
    ProviderStatus,
};
pub use prompt::PromptTemplate;
pub use provider_registry::{ProviderPlan, ProviderRegistry, RegistryError};
