//! Sentence-window retrieval with a rerank pass.
//!
//! The query pipeline runs as three explicit stages:
//!
//! 1. [`candidates`](AdvancedRetriever::candidates): vector top-N over
//!    sentences;
//! 2. [`rerank_stage`](AdvancedRetriever::rerank_stage): relevance scoring of
//!    the candidates' windows, narrowed to top-k, or the vector-order top-k
//!    marked degraded when reranking is unavailable;
//! 3. context assembly of the surviving windows.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::{
    Answer, IndexReport, Retriever, RetrieverKind, RetrieverState, StateCell, check_sources,
};
use crate::config::ArenaConfig;
use crate::context::assemble_windows;
use crate::document::{Degradation, Document, Hit, Record, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, Stage};
use crate::generation::{GenerationProvider, Generator};
use crate::index::{EmbeddingIndex, IndexSnapshot};
use crate::reranker::{RerankProvider, Reranker};
use crate::segment::Segmenter;

/// Matches on sentences, reranks on windows, delivers windows.
pub struct AdvancedRetriever {
    segmenter: Segmenter,
    top_n: usize,
    top_k: usize,
    index: EmbeddingIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Reranker>,
    generator: Generator,
    state: StateCell,
}

impl AdvancedRetriever {
    /// Build an advanced retriever from the `advanced`, `retry` and
    /// `embedding` sections of `config`.
    ///
    /// Without a rerank provider every result is the degraded vector-order
    /// fallback.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
    /// for inconsistent configuration.
    pub fn new(
        config: &ArenaConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Option<Arc<dyn RerankProvider>>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            segmenter: Segmenter::new(config.advanced.window_radius),
            top_n: config.advanced.top_n,
            top_k: config.advanced.top_k,
            index: EmbeddingIndex::new(config.embedding.clone(), config.retry.clone()),
            embedder,
            reranker: reranker.map(|p| Reranker::new(p, config.retry.clone())),
            generator: Generator::new(generator, config.retry.clone()),
            state: StateCell::new(),
        })
    }

    /// The underlying index.
    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    /// Stage 1: the `top_n` sentences closest to the query.
    pub async fn candidates(&self, query: &str) -> Result<Vec<Hit>> {
        self.state.ensure_indexed(self.kind())?;
        self.index.search(query, self.top_n, self.embedder.as_ref()).await
    }

    /// Stage 2: narrow candidates to `top_k` by rerank relevance.
    ///
    /// Never fails. When reranking is unavailable the first `top_k`
    /// candidates are returned in vector order and the result is marked
    /// degraded.
    pub async fn rerank_stage(&self, query: &str, candidates: Vec<Hit>) -> RetrievalResult {
        if candidates.is_empty() {
            return RetrievalResult::default();
        }

        let Some(reranker) = &self.reranker else {
            warn!(retriever = "advanced", "no rerank provider configured, using vector order");
            return self.fallback(candidates, Degradation {
                stage: Stage::Rerank,
                attempts: 0,
                reason: "no rerank provider configured".into(),
            });
        };

        match reranker.rerank(query, &candidates, self.top_k).await {
            Ok(hits) => RetrievalResult::complete(hits),
            Err(err) => {
                let attempts = err.attempts().unwrap_or(1);
                warn!(
                    retriever = "advanced",
                    reranker = reranker.provider_name(),
                    attempts,
                    error = %err,
                    "reranking unavailable, falling back to vector order"
                );
                self.fallback(candidates, Degradation {
                    stage: Stage::Rerank,
                    attempts,
                    reason: err.to_string(),
                })
            }
        }
    }

    fn fallback(&self, mut candidates: Vec<Hit>, degradation: Degradation) -> RetrievalResult {
        candidates.truncate(self.top_k);
        RetrievalResult { hits: candidates, degraded: Some(degradation) }
    }
}

#[async_trait]
impl Retriever for AdvancedRetriever {
    fn kind(&self) -> RetrieverKind {
        RetrieverKind::Advanced
    }

    fn state(&self) -> RetrieverState {
        self.state.get()
    }

    async fn index_documents(&self, documents: &[Document]) -> Result<IndexReport> {
        if documents.is_empty() {
            return Ok(IndexReport::default());
        }
        check_sources(documents)?;

        let records: Vec<Record> =
            documents.iter().flat_map(|d| self.segmenter.records(d)).map(Record::from).collect();
        let record_count = records.len();
        let added = self.index.add(records, self.embedder.as_ref()).await.map_err(|e| {
            error!(retriever = "advanced", error = %e, "indexing failed");
            e
        })?;
        self.state.mark_indexed();

        info!(
            retriever = "advanced",
            documents = documents.len(),
            sentences = record_count,
            window_radius = self.segmenter.radius(),
            "indexed documents"
        );
        Ok(IndexReport {
            documents: documents.len(),
            records: record_count,
            inserted: added.inserted,
            replaced: added.replaced,
        })
    }

    async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        let candidates = self.candidates(query).await?;
        Ok(self.rerank_stage(query, candidates).await)
    }

    async fn answer(&self, query: &str) -> Result<Answer> {
        let retrieval = self.retrieve(query).await?;
        let context = assemble_windows(&retrieval);
        let response = self.generator.generate(&context, query).await?;
        self.state.mark_ready();

        info!(
            retriever = "advanced",
            hits = retrieval.len(),
            degraded = retrieval.is_degraded(),
            "answered query"
        );
        Ok(Answer { retriever: self.kind(), response, retrieval, context })
    }

    async fn snapshot(&self) -> IndexSnapshot {
        self.index.snapshot().await
    }

    async fn restore(&self, snapshot: IndexSnapshot) -> Result<()> {
        self.index.restore(snapshot).await?;
        self.state.mark_indexed();
        Ok(())
    }
}
