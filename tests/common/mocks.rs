//! Mock providers for testing.
//!
//! Deterministic stand-ins for the embedding and answer providers so the
//! pipeline and failover logic can be exercised without network access.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use via::llm::{FailureKind, Generation, GenerationProvider, ProviderError};
use via::rag::EmbeddingProvider;

/// Dimension of [`MockEmbedder`] vectors.
pub const MOCK_DIMENSION: usize = 32;

/// Embeds text as a bag of hashed lowercase words, so texts sharing words
/// are close under cosine distance.
pub struct MockEmbedder {
    provider_id: String,
    calls: AtomicUsize,
    failure: Mutex<Option<ProviderError>>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_id("mock:bag-of-words")
    }

    pub fn with_id(provider_id: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Make every following call fail with `err`.
    pub fn fail_with(&self, err: ProviderError) {
        *self.failure.lock() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    /// Number of `embed_batch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; MOCK_DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            let bucket = word
                .bytes()
                .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % MOCK_DIMENSION] += 1.0;
        }
        // keep empty-ish texts valid for cosine
        vector[MOCK_DIMENSION - 1] += 0.01;
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Answer provider that plays back scripted outcomes, then answers
/// successfully. Records every query and context it receives.
pub struct ScriptedGenerator {
    name: String,
    model: String,
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    contexts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            model: format!("{}-model", name),
            script: Mutex::new(VecDeque::new()),
            delay: None,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds.
    pub fn healthy(name: &str) -> Arc<Self> {
        Arc::new(Self::new(name))
    }

    /// Fails every call with a provider failure of `kind`.
    pub fn failing(name: &str, kind: FailureKind) -> Arc<Self> {
        let generator = Self::new(name);
        for _ in 0..64 {
            generator.push_failure(kind);
        }
        Arc::new(generator)
    }

    /// Sleeps for `delay` before answering.
    pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
        let mut generator = Self::new(name);
        generator.delay = Some(delay);
        Arc::new(generator)
    }

    pub fn push_failure(&self, kind: FailureKind) {
        self.script
            .lock()
            .push_back(Err(ProviderError::failure(kind, "scripted failure")));
    }

    pub fn push_error(&self, err: ProviderError) {
        self.script.lock().push_back(Err(err));
    }

    pub fn push_answer(&self, text: &str) {
        self.script.lock().push_back(Ok(text.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contexts(&self) -> Vec<String> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    fn provider_id(&self) -> &str {
        &self.name
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&self, query: &str, context: &str) -> Result<Generation, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        let text = match next {
            Some(outcome) => outcome?,
            None => format!("{} answered: {}", self.name, query),
        };
        Ok(Generation {
            response_text: text,
            model_id: self.model.clone(),
        })
    }
}
