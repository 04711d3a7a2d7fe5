//! # VIA - Virtual Insurance Assistant
//!
//! Answers natural-language questions about insurance policies by retrieving
//! the relevant passages from the user's own documents and handing them, as
//! grounding context, to a large-language-model provider. When a provider
//! fails (rate limit, exhausted quota, bad key, timeout, outage) the query
//! moves on to the next configured provider and the failed one cools down.
//!
//! ## Overview
//!
//! VIA can be used in two ways:
//!
//! 1. **As a command-line tool** - Run the `via` binary
//! 2. **As a library** - Build a [`RagOrchestrator`] in your own application
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use via::{RagOrchestrator, ViaConfig};
//! use via::types::ExtractedDocument;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ViaConfig::load("via.toml")?;
//!     let rag = RagOrchestrator::from_config(&config).await?;
//!
//!     let policy = ExtractedDocument::from_pages("home.pdf", ["Page one", "Page two"]);
//!     rag.ingest_document(&policy).await?;
//!
//!     let answer = rag.answer_query("Is water damage covered?").await?;
//!     println!("{} [{}]", answer.response_text, answer.provider_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`rag`] - Chunking, embeddings, index store, context assembly, orchestration
//! - [`llm`] - Answer providers, error taxonomy and failover
//! - [`memory`] - Session conversation log
//! - [`types`] - Documents, answers and pipeline errors
//! - [`utils`] - `via.toml` configuration
//! - [`cli`] - Command-line interface
//!
//! The vector index lives in the `via-index` crate and is re-exported as
//! [`index`].

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// Command-line interface.
pub mod cli;
/// Answer provider clients and failover.
pub mod llm;
/// Conversation memory.
pub mod memory;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (documents, answers, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

pub use via_index as index;

// Re-export commonly used types
pub use llm::{FailoverController, GenerationProvider, ProviderError, ProviderRegistry};
pub use rag::{EmbeddingProvider, IndexStore, RagOrchestrator, TextChunker};
pub use types::{ConversationTurn, ExtractedDocument, IngestError, QueryAnswer, QueryError};
pub use utils::toml_config::{ConfigError, ViaConfig};
