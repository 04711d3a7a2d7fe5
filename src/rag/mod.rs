//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! Grounds answers about insurance policies in the user's own documents.
//!
//! # Module Structure
//!
//! - [`rag::chunker`](crate::rag::chunker) - Overlapping, boundary-aware text windows
//! - [`rag::embeddings`](crate::rag::embeddings) - Embedding providers (OpenAI, Ollama)
//! - [`rag::store`](crate::rag::store) - Persisted index with single-writer inserts
//! - [`rag::context`](crate::rag::context) - Numbered grounding context
//! - [`rag::cache`](crate::rag::cache) - Query embedding cache
//! - [`rag::orchestrator`](crate::rag::orchestrator) - The pipeline itself
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are chunked and batch-embedded
//! 2. **Storage** - Embedded chunks are appended to the index and persisted
//! 3. **Retrieval** - The query is embedded and the nearest chunks retrieved
//! 4. **Generation** - The failover chain answers from the assembled context
//!
//! # Example
//!
//! ```ignore
//! use via::rag::RagOrchestrator;
//! use via::types::ExtractedDocument;
//!
//! let rag = RagOrchestrator::from_config(&config).await?;
//! rag.ingest_document(&ExtractedDocument::from_pages("policy.pdf", pages)).await?;
//!
//! let answer = rag.answer_query("What is my deductible?").await?;
//! println!("{} [{}:{}]", answer.response_text, answer.provider_id, answer.model_id);
//! ```

pub mod cache;
pub mod chunker;
pub mod context;
pub mod embeddings;
pub mod orchestrator;
pub mod store;

pub use chunker::{ChunkError, TextChunker};
pub use context::{assemble, NO_CONTEXT_SENTINEL};
pub use embeddings::{EmbeddingProvider, EmbeddingSettings, OllamaEmbedder, OpenAIEmbedder};
pub use orchestrator::{RagOrchestrator, RetrievalSettings, SetupError};
pub use store::IndexStore;
