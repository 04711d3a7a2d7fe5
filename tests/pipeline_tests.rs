//! End-to-end RAG pipeline tests with mock providers and a temporary index.

mod common;

use common::mocks::{MockEmbedder, ScriptedGenerator};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use via::index::{load_index, save_index, DistanceMetric, VectorIndex};
use via::llm::{FailoverConfig, FailoverController, FailureKind, GenerationProvider, ProviderError};
use via::rag::{
    ChunkError, IndexStore, RagOrchestrator, RetrievalSettings, TextChunker, NO_CONTEXT_SENTINEL,
};
use via::{ExtractedDocument, IngestError, QueryError};

const DEDUCTIBLE: &str = "The annual deductible for the home policy is 500 dollars per claim.";
const FLOOD: &str = "Flood damage caused by rising surface water is excluded from coverage.";

struct Harness {
    _dir: TempDir,
    path: PathBuf,
    embedder: Arc<MockEmbedder>,
    primary: Arc<ScriptedGenerator>,
    secondary: Arc<ScriptedGenerator>,
    rag: RagOrchestrator,
}

async fn orchestrator(
    path: &PathBuf,
    embedder: &Arc<MockEmbedder>,
    providers: &[&Arc<ScriptedGenerator>],
) -> RagOrchestrator {
    let store = IndexStore::open(path, DistanceMetric::Cosine, "mock:bag-of-words")
        .await
        .unwrap();
    let chain: Vec<Arc<dyn GenerationProvider>> = providers
        .iter()
        .map(|p| Arc::clone(p) as Arc<dyn GenerationProvider>)
        .collect();
    RagOrchestrator::new(
        TextChunker::new(200, 40).unwrap(),
        Arc::clone(embedder) as Arc<dyn via::EmbeddingProvider>,
        store,
        FailoverController::new(chain, FailoverConfig::default()),
        RetrievalSettings {
            top_k: 3,
            max_context_chunks: 3,
            query_cache_size: 16,
        },
    )
}

async fn harness_with(primary: Arc<ScriptedGenerator>, secondary: Arc<ScriptedGenerator>) -> Harness {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data").join("index.json");
    let embedder = Arc::new(MockEmbedder::new());
    let rag = orchestrator(&path, &embedder, &[&primary, &secondary]).await;
    Harness {
        _dir: dir,
        path,
        embedder,
        primary,
        secondary,
        rag,
    }
}

async fn harness() -> Harness {
    harness_with(
        ScriptedGenerator::healthy("primary"),
        ScriptedGenerator::healthy("secondary"),
    )
    .await
}

async fn ingest_policies(h: &Harness) {
    h.rag
        .ingest_document(&ExtractedDocument::new("deductible.txt", DEDUCTIBLE))
        .await
        .unwrap();
    h.rag
        .ingest_document(&ExtractedDocument::new("flood.txt", FLOOD))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ingest_and_answer() {
    let h = harness().await;
    ingest_policies(&h).await;

    let answer = h.rag.answer_query(FLOOD).await.unwrap();

    assert_eq!(answer.provider_id, "primary");
    assert_eq!(answer.model_id, "primary-model");
    let contexts = h.primary.contexts();
    assert_eq!(contexts.len(), 1);
    assert!(contexts[0].starts_with(&format!("Context 1:\n{}\n", FLOOD)));
    assert!(contexts[0].contains(DEDUCTIBLE));

    let turns = h.rag.list_conversation();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].query, FLOOD);
    assert_eq!(turns[0].response, answer.response_text);
    assert_eq!(turns[0].provider_id, "primary");
}

#[tokio::test]
async fn test_ingest_persists_index() {
    let h = harness().await;
    ingest_policies(&h).await;

    let stats = h.rag.index_stats().unwrap();
    assert_eq!(stats.chunk_count, 2);
    assert_eq!(stats.document_count, 2);
    assert_eq!(stats.dimension, Some(common::mocks::MOCK_DIMENSION));
    assert_eq!(stats.embedding_provider_id.as_deref(), Some("mock:bag-of-words"));

    let persisted = load_index(&h.path).await.unwrap();
    assert_eq!(persisted.len(), 2);

    // a fresh orchestrator over the same file answers without re-ingesting
    let reopened = orchestrator(&h.path, &h.embedder, &[&h.primary]).await;
    assert_eq!(reopened.index_stats().unwrap().chunk_count, 2);
    reopened.answer_query(DEDUCTIBLE).await.unwrap();
}

#[tokio::test]
async fn test_query_without_index() {
    let h = harness().await;

    let err = h.rag.answer_query("What is my deductible?").await.unwrap_err();

    assert!(matches!(err, QueryError::NoIndex));
    assert_eq!(h.primary.calls(), 0);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let h = harness().await;
    ingest_policies(&h).await;

    assert!(matches!(
        h.rag.answer_query("   ").await,
        Err(QueryError::EmptyQuery)
    ));
}

#[tokio::test]
async fn test_empty_index_passes_sentinel() {
    let h = harness().await;
    save_index(&VectorIndex::new(DistanceMetric::Cosine), &h.path)
        .await
        .unwrap();
    let rag = orchestrator(&h.path, &h.embedder, &[&h.primary]).await;

    rag.answer_query("Is theft covered?").await.unwrap();

    assert_eq!(h.primary.contexts(), vec![NO_CONTEXT_SENTINEL.to_string()]);
}

#[tokio::test]
async fn test_empty_document_rejected() {
    let h = harness().await;

    let err = h
        .rag
        .ingest_document(&ExtractedDocument::new("scan.pdf", " \n\n \t"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::Chunk(ChunkError::EmptyInput { .. })
    ));
    assert!(h.rag.index_stats().is_none());
    assert!(!h.path.exists());
}

#[tokio::test]
async fn test_duplicate_document_rejected() {
    let h = harness().await;
    ingest_policies(&h).await;

    let err = h
        .rag
        .ingest_document(&ExtractedDocument::new("flood.txt", "Different text"))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::AlreadyIndexed(ref id) if id == "flood.txt"));
    assert_eq!(h.rag.index_stats().unwrap().chunk_count, 2);
}

#[tokio::test]
async fn test_embedding_failure_leaves_index_unchanged() {
    let h = harness().await;
    ingest_policies(&h).await;
    let before = std::fs::read(&h.path).unwrap();

    h.embedder
        .fail_with(ProviderError::failure(FailureKind::RateLimited, "slow down"));
    let err = h
        .rag
        .ingest_document(&ExtractedDocument::new("theft.txt", "Theft is covered."))
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Embedding(_)));
    assert_eq!(h.rag.index_stats().unwrap().chunk_count, 2);
    assert_eq!(std::fs::read(&h.path).unwrap(), before);
}

#[tokio::test]
async fn test_query_embedding_failure() {
    let h = harness().await;
    ingest_policies(&h).await;
    h.embedder
        .fail_with(ProviderError::failure(FailureKind::Unavailable, "down"));

    let err = h.rag.answer_query("Is theft covered?").await.unwrap_err();

    assert!(matches!(err, QueryError::Embedding(_)));
    assert!(h.rag.list_conversation().is_empty());
}

#[tokio::test]
async fn test_repeated_query_uses_cache() {
    let h = harness().await;
    ingest_policies(&h).await;
    let after_ingest = h.embedder.calls();

    h.rag.answer_query("Is flood covered?").await.unwrap();
    h.rag.answer_query("Is flood covered?").await.unwrap();

    assert_eq!(h.embedder.calls(), after_ingest + 1);
    assert_eq!(h.rag.cache_stats().hits, 1);
}

#[tokio::test]
async fn test_answer_fails_over() {
    let h = harness_with(
        ScriptedGenerator::failing("primary", FailureKind::QuotaExhausted),
        ScriptedGenerator::healthy("secondary"),
    )
    .await;
    ingest_policies(&h).await;

    let answer = h.rag.answer_query("What is the deductible?").await.unwrap();

    assert_eq!(answer.provider_id, "secondary");
    assert_eq!(h.rag.list_conversation()[0].provider_id, "secondary");
    assert_eq!(h.secondary.calls(), 1);
}

#[tokio::test]
async fn test_all_providers_down_is_reported() {
    let h = harness_with(
        ScriptedGenerator::failing("primary", FailureKind::RateLimited),
        ScriptedGenerator::failing("secondary", FailureKind::Timeout),
    )
    .await;
    ingest_policies(&h).await;

    let err = h.rag.answer_query("What is the deductible?").await.unwrap_err();

    assert!(err.is_temporarily_unavailable());
    assert!(err.to_string().contains("temporarily unavailable"));
    assert!(h.rag.list_conversation().is_empty());
}

#[tokio::test]
async fn test_clear_history() {
    let h = harness().await;
    ingest_policies(&h).await;
    h.rag.answer_query("one").await.unwrap();
    h.rag.answer_query("two").await.unwrap();
    assert_eq!(h.rag.list_conversation().len(), 2);

    h.rag.clear_history();

    assert!(h.rag.list_conversation().is_empty());
}

#[tokio::test]
async fn test_pages_are_recorded() {
    let h = harness().await;
    let page_one = "Section 1. ".repeat(30);
    let page_two = "Section 2. ".repeat(30);
    let document = ExtractedDocument::from_pages("policy.pdf", [page_one.as_str(), page_two.as_str()]);

    let count = h.rag.ingest_document(&document).await.unwrap();
    assert!(count >= 3);

    let index = load_index(&h.path).await.unwrap();
    let pages: Vec<Option<u32>> = index.chunks().iter().map(|c| c.page_number).collect();
    assert_eq!(pages.first(), Some(&Some(1)));
    assert_eq!(pages.last(), Some(&Some(2)));
    assert!(index
        .chunks()
        .iter()
        .all(|c| c.id.starts_with("policy.pdf#")));
}

#[tokio::test]
async fn test_ingest_text_with_page_offsets() {
    let h = harness().await;
    let text = format!("{}\n\n{}", DEDUCTIBLE, FLOOD);
    let second_page = DEDUCTIBLE.chars().count() + 2;

    h.rag
        .ingest_text(&text, "home.txt", &[0, second_page])
        .await
        .unwrap();

    let index = load_index(&h.path).await.unwrap();
    assert!(index.contains_source("home.txt"));
    assert_eq!(index.chunks()[0].page_number, Some(1));
}

#[tokio::test]
async fn test_other_embedder_cannot_open_index() {
    let h = harness().await;
    ingest_policies(&h).await;

    let result = IndexStore::open(&h.path, DistanceMetric::Cosine, "openai:text-embedding-3-small").await;

    assert!(matches!(
        result,
        Err(via::index::Error::ProviderMismatch { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestion_is_serialized() {
    let h = Arc::new(harness().await);

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                h.rag
                    .ingest_document(&ExtractedDocument::new(
                        format!("doc-{}.txt", i % 3),
                        format!("Policy rider number {} covers item {}.", i % 3, i % 3),
                    ))
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(IngestError::AlreadyIndexed(_)) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 3);
    let stats = h.rag.index_stats().unwrap();
    assert_eq!(stats.document_count, 3);
    assert_eq!(load_index(&h.path).await.unwrap().len(), stats.chunk_count);
}
