//! RAG orchestrator.
//!
//! One explicit instance per deployment, holding the chunker, the
//! embedding provider, the index store, the failover controller and the
//! conversation log. The surrounding application constructs it once and
//! passes it around; nothing here is global.
//!
//! ```text
//! ingest:  chunk -> embed (batch) -> insert -> persist
//! answer:  embed query -> search -> assemble -> failover generate -> log
//! ```

use crate::llm::error::ProviderError;
use crate::llm::failover::{FailoverConfig, FailoverController, ProviderState};
use crate::llm::provider_registry::{ProviderRegistry, RegistryError};
use crate::memory::ConversationLog;
use crate::rag::cache::{CacheStats, QueryCache};
use crate::rag::chunker::{ChunkError, TextChunker};
use crate::rag::context::assemble;
use crate::rag::embeddings::EmbeddingProvider;
use crate::rag::store::IndexStore;
use crate::types::{ConversationTurn, ExtractedDocument, IngestError, QueryAnswer, QueryError};
use crate::utils::toml_config::ViaConfig;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, instrument};
use via_index::IndexStats;

/// Retrieval knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalSettings {
    /// Chunks retrieved per query.
    pub top_k: usize,
    /// Chunks placed in the prompt.
    pub max_context_chunks: usize,
    /// Query embedding cache entries, 0 disables.
    pub query_cache_size: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_context_chunks: 3,
            query_cache_size: 256,
        }
    }
}

/// Errors raised while assembling an orchestrator from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Providers could not be built.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The persisted index could not be opened.
    #[error("Failed to open index: {0}")]
    Index(#[from] via_index::Error),

    /// Chunk settings are invalid.
    #[error(transparent)]
    Chunker(#[from] ChunkError),
}

/// The retrieval-augmented answering pipeline.
pub struct RagOrchestrator {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    store: IndexStore,
    failover: FailoverController,
    cache: QueryCache,
    conversation: ConversationLog,
    settings: RetrievalSettings,
}

impl RagOrchestrator {
    /// Wire an orchestrator from already constructed parts.
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        store: IndexStore,
        failover: FailoverController,
        settings: RetrievalSettings,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
            failover,
            cache: QueryCache::new(settings.query_cache_size),
            conversation: ConversationLog::new(),
            settings,
        }
    }

    /// Build everything `config` describes: embedder, provider chain and
    /// the index at `[index] path`.
    pub async fn from_config(config: &ViaConfig) -> Result<Self, SetupError> {
        let registry = ProviderRegistry::builtin();
        let embedder = registry.build_embedder(config)?;
        let chain = registry.build_chain(config)?;
        let chunker = TextChunker::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
        let store =
            IndexStore::open(&config.index.path, config.index.metric, embedder.provider_id())
                .await?;
        let failover = FailoverController::new(
            chain,
            FailoverConfig::default()
                .with_cooldown(config.cooldown())
                .with_attempt_timeout(config.attempt_timeout()),
        );

        Ok(Self::new(
            chunker,
            embedder,
            store,
            failover,
            RetrievalSettings {
                top_k: config.rag.top_k,
                max_context_chunks: config.rag.max_context_chunks,
                query_cache_size: config.rag.query_cache_size,
            },
        ))
    }

    /// Chunk, embed, index and persist one document.
    ///
    /// Any failure aborts the whole document; the index (in memory and on
    /// disk) is then exactly as before the call.
    #[instrument(skip_all, fields(source = %document.source_id))]
    pub async fn ingest_document(&self, document: &ExtractedDocument) -> Result<usize, IngestError> {
        if self.store.contains_source(&document.source_id) {
            return Err(IngestError::AlreadyIndexed(document.source_id.clone()));
        }

        let started = Instant::now();
        let chunks = self.chunker.chunk(document)?;
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(IngestError::Embedding)?;
        if vectors.len() != chunks.len() {
            return Err(IngestError::EmbeddingCount {
                expected: chunks.len(),
                actual: vectors.len(),
            });
        }

        let embedded = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| chunk.with_embedding(vector))
            .collect();

        let count = self
            .store
            .insert_document(self.embedder.provider_id(), &document.source_id, embedded)
            .await?;

        info!(
            chunks = count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Document ingested"
        );
        Ok(count)
    }

    /// Ingest plain text with optional page start offsets (in characters).
    pub async fn ingest_text(
        &self,
        text: &str,
        source_id: &str,
        page_starts: &[usize],
    ) -> Result<usize, IngestError> {
        let document = ExtractedDocument {
            source_id: source_id.to_string(),
            text: text.to_string(),
            page_starts: page_starts.to_vec(),
        };
        self.ingest_document(&document).await
    }

    /// Answer a question from the indexed documents.
    #[instrument(skip_all, fields(query_len = query.len()))]
    pub async fn answer_query(&self, query: &str) -> Result<QueryAnswer, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        let index = self.store.snapshot().ok_or(QueryError::NoIndex)?;

        let started = Instant::now();
        let vector = self
            .embed_query(query)
            .await
            .map_err(QueryError::Embedding)?;
        let hits = index.search(&vector, self.settings.top_k)?;
        debug!(hits = hits.len(), "Retrieved chunks");

        let context = assemble(&hits, self.settings.max_context_chunks);
        let answer = self.failover.generate(query, &context).await?;

        let answer = QueryAnswer {
            response_text: answer.generation.response_text,
            provider_id: answer.provider_id,
            model_id: answer.generation.model_id,
        };
        self.conversation.record(query, &answer);

        info!(
            provider = %answer.provider_id,
            model = %answer.model_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query answered"
        );
        Ok(answer)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, ProviderError> {
        let key = QueryCache::compute_key(self.embedder.provider_id(), query);
        if let Some(vector) = self.cache.get(&key) {
            debug!("Query embedding cache hit");
            return Ok(vector);
        }
        let vector = self.embedder.embed(query).await?;
        self.cache.put(key, vector.clone());
        Ok(vector)
    }

    /// Forget the conversation so far.
    pub fn clear_history(&self) {
        self.conversation.clear();
    }

    /// Conversation turns, oldest first.
    pub fn list_conversation(&self) -> Vec<ConversationTurn> {
        self.conversation.turns()
    }

    /// Last `window` conversation turns, oldest first.
    pub fn recent_conversation(&self, window: usize) -> Vec<ConversationTurn> {
        self.conversation.recent(window)
    }

    /// Statistics of the current index, `None` before the first ingestion.
    pub fn index_stats(&self) -> Option<IndexStats> {
        self.store.stats()
    }

    /// State of every answer provider, in failover order.
    pub fn provider_states(&self) -> Vec<ProviderState> {
        self.failover.states()
    }

    /// Query embedding cache counters.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Identity of the embedding vector space.
    pub fn embedding_provider_id(&self) -> &str {
        self.embedder.provider_id()
    }

    /// Whether any answer provider is configured.
    pub fn has_providers(&self) -> bool {
        !self.failover.is_empty()
    }
}
