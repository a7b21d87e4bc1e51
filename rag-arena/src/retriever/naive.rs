//! Fixed-width chunks matched by vector similarity alone.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{
    Answer, IndexReport, Retriever, RetrieverKind, RetrieverState, StateCell, check_sources,
};
use crate::chunking::FixedWidthChunker;
use crate::config::ArenaConfig;
use crate::context::assemble_chunks;
use crate::document::{Document, Record, RetrievalResult};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::{GenerationProvider, Generator};
use crate::index::{EmbeddingIndex, IndexSnapshot};

/// The baseline: chunk → embed → top-k → generate, with no reranking.
///
/// # Example
///
/// ```rust,ignore
/// let naive = NaiveRetriever::new(&config, embedder, generator)?;
/// naive.index_documents(&documents).await?;
/// let answer = naive.answer("What was Q1 revenue growth?").await?;
/// ```
pub struct NaiveRetriever {
    chunker: FixedWidthChunker,
    top_k: usize,
    index: EmbeddingIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Generator,
    state: StateCell,
}

impl NaiveRetriever {
    /// Build a naive retriever from the `naive`, `retry` and `embedding`
    /// sections of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
    /// for inconsistent configuration.
    pub fn new(
        config: &ArenaConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chunker: FixedWidthChunker::new(config.naive.chunk_size, config.naive.chunk_overlap)?,
            top_k: config.naive.top_k,
            index: EmbeddingIndex::new(config.embedding.clone(), config.retry.clone()),
            embedder,
            generator: Generator::new(generator, config.retry.clone()),
            state: StateCell::new(),
        })
    }

    /// The underlying index.
    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }
}

#[async_trait]
impl Retriever for NaiveRetriever {
    fn kind(&self) -> RetrieverKind {
        RetrieverKind::Naive
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
            documents.iter().flat_map(|d| self.chunker.chunk(d)).map(Record::from).collect();
        let record_count = records.len();
        let added = self.index.add(records, self.embedder.as_ref()).await.map_err(|e| {
            error!(retriever = "naive", error = %e, "indexing failed");
            e
        })?;
        self.state.mark_indexed();

        info!(
            retriever = "naive",
            documents = documents.len(),
            chunks = record_count,
            chunk_size = self.chunker.chunk_size(),
            chunk_overlap = self.chunker.chunk_overlap(),
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
        self.state.ensure_indexed(self.kind())?;
        let hits = self.index.search(query, self.top_k, self.embedder.as_ref()).await?;
        Ok(RetrievalResult::complete(hits))
    }

    async fn answer(&self, query: &str) -> Result<Answer> {
        let retrieval = self.retrieve(query).await?;
        let context = assemble_chunks(&retrieval);
        let response = self.generator.generate(&context, query).await?;
        self.state.mark_ready();

        info!(retriever = "naive", hits = retrieval.len(), "answered query");
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
