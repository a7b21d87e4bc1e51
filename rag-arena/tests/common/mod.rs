//! Deterministic in-process capabilities shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rag_arena::{
    EmbeddingProvider, GenerationProvider, RagError, RelevanceScore, RerankProvider, Result,
    RetryConfig,
};

pub const DIMENSIONS: usize = 4096;

/// Lowercased words with surrounding punctuation removed.
pub fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Retry settings that keep paused-clock tests short.
pub fn quick_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig { max_attempts, base_delay_ms: 10, max_delay_ms: 100, timeout_ms: 1_000 }
}

/// Bag-of-words vectors with hashed buckets.
#[derive(Default)]
pub struct HashEmbedder {
    pub batch_calls: AtomicUsize,
    pub query_calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; DIMENSIONS];
        for token in tokens(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            vector[(hasher.finish() % DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Self::vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Always fails with a retryable embedding error.
#[derive(Default)]
pub struct FailingEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn name(&self) -> &str {
        "failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::EmbeddingError { provider: "failing".into(), message: "503".into() })
    }

    async fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::EmbeddingError { provider: "failing".into(), message: "503".into() })
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Embeds batches like [`HashEmbedder`] but fails every single-text call,
/// so indexing succeeds and querying does not.
#[derive(Default)]
pub struct QueryFailingEmbedder {
    pub query_calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for QueryFailingEmbedder {
    fn name(&self) -> &str {
        "query-failing"
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::EmbeddingError { provider: "query-failing".into(), message: "503".into() })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| HashEmbedder::vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }
}

/// Answers successfully without scoring any document.
#[derive(Default)]
pub struct EmptyReranker {
    pub calls: AtomicUsize,
}

#[async_trait]
impl RerankProvider for EmptyReranker {
    fn name(&self) -> &str {
        "empty"
    }

    async fn score(&self, _query: &str, _documents: &[&str]) -> Result<Vec<RelevanceScore>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

/// Scores a document by how many distinct query words it contains.
#[derive(Default)]
pub struct KeywordReranker {
    pub calls: AtomicUsize,
}

#[async_trait]
impl RerankProvider for KeywordReranker {
    fn name(&self) -> &str {
        "keyword"
    }

    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<RelevanceScore>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let wanted: HashSet<String> = tokens(query).into_iter().collect();
        Ok(documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let present: HashSet<String> = tokens(doc).into_iter().collect();
                let score = wanted.intersection(&present).count() as f32;
                RelevanceScore { index, score }
            })
            .collect())
    }
}

/// Always fails, optionally after sleeping past any reasonable timeout.
#[derive(Default)]
pub struct FailingReranker {
    pub calls: AtomicUsize,
    pub hang: bool,
}

#[async_trait]
impl RerankProvider for FailingReranker {
    fn name(&self) -> &str {
        "failing"
    }

    async fn score(&self, _query: &str, _documents: &[&str]) -> Result<Vec<RelevanceScore>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3_600)).await;
        }
        Err(RagError::RerankerError { reranker: "failing".into(), message: "429".into() })
    }
}

/// Returns a fixed answer and records every context it was given.
#[derive(Default)]
pub struct EchoGenerator {
    pub contexts: Mutex<Vec<String>>,
}

impl EchoGenerator {
    pub fn last_context(&self) -> Option<String> {
        self.contexts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationProvider for EchoGenerator {
    fn name(&self) -> &str {
        "echo"
    }

    async fn generate(&self, context: &str, query: &str) -> Result<String> {
        self.contexts.lock().unwrap().push(context.to_string());
        Ok(format!("answer to {query:?} from {} context chars", context.chars().count()))
    }
}

/// Always fails.
#[derive(Default)]
pub struct FailingGenerator {
    pub calls: AtomicUsize,
}

#[async_trait]
impl GenerationProvider for FailingGenerator {
    fn name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _context: &str, _query: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RagError::GenerationError { provider: "failing".into(), message: "500".into() })
    }
}
