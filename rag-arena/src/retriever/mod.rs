//! The two retrieval architectures under comparison.
//!
//! Both share the same lifecycle: [`RetrieverState::Idle`] until documents
//! are indexed, [`RetrieverState::Indexed`] afterwards, and
//! [`RetrieverState::Ready`] once a query has been answered. Querying an
//! idle retriever fails with [`RagError::NotIndexed`].

mod advanced;
mod naive;

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use advanced::AdvancedRetriever;
pub use naive::NaiveRetriever;

use crate::document::{Document, RetrievalResult};
use crate::error::{RagError, Result};
use crate::index::IndexSnapshot;

/// Which architecture produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverKind {
    /// Fixed-width chunks, vector top-k.
    Naive,
    /// Sentence windows, vector top-N, rerank top-k.
    Advanced,
}

impl RetrieverKind {
    /// Lowercase name used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            RetrieverKind::Naive => "naive",
            RetrieverKind::Advanced => "advanced",
        }
    }
}

impl fmt::Display for RetrieverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a retriever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrieverState {
    /// Nothing indexed yet; queries are rejected.
    Idle,
    /// Documents indexed, no query answered yet.
    Indexed,
    /// At least one query answered.
    Ready,
}

/// Atomic holder for a [`RetrieverState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    pub(crate) fn get(&self) -> RetrieverState {
        match self.0.load(Ordering::Acquire) {
            0 => RetrieverState::Idle,
            1 => RetrieverState::Indexed,
            _ => RetrieverState::Ready,
        }
    }

    /// Idle becomes Indexed; later states are kept.
    pub(crate) fn mark_indexed(&self) {
        let _ = self.0.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire);
    }

    pub(crate) fn mark_ready(&self) {
        self.0.store(2, Ordering::Release);
    }

    pub(crate) fn ensure_indexed(&self, kind: RetrieverKind) -> Result<()> {
        match self.get() {
            RetrieverState::Idle => Err(RagError::NotIndexed { retriever: kind.as_str() }),
            _ => Ok(()),
        }
    }
}

/// Record ids are keyed on [`Document::source`], so one batch must not
/// repeat a source.
pub(crate) fn check_sources(documents: &[Document]) -> Result<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    for document in documents {
        if !seen.insert(document.source.as_str()) {
            return Err(RagError::DuplicateSource(document.source.clone()));
        }
    }
    Ok(())
}

/// What an indexing call stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Documents processed.
    pub documents: usize,
    /// Records produced from them.
    pub records: usize,
    /// Records whose id was new to the index.
    pub inserted: usize,
    /// Records that replaced an existing entry.
    pub replaced: usize,
}

/// A generated answer with the retrieval that grounded it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    /// The retriever that produced this answer.
    pub retriever: RetrieverKind,
    /// Text returned by the generation provider.
    pub response: String,
    /// Hits the context was assembled from.
    pub retrieval: RetrievalResult,
    /// The exact context sent to generation.
    pub context: String,
}

/// Common interface of the naive and advanced retrievers.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Which architecture this is.
    fn kind(&self) -> RetrieverKind;

    /// Current lifecycle state.
    fn state(&self) -> RetrieverState;

    /// Split, embed and store documents. Re-indexing a document replaces
    /// its records in place.
    ///
    /// Fails with [`RagError::DuplicateSource`] before embedding anything if
    /// two documents share a source.
    async fn index_documents(&self, documents: &[Document]) -> Result<IndexReport>;

    /// Run retrieval only, without generation.
    async fn retrieve(&self, query: &str) -> Result<RetrievalResult>;

    /// Retrieve, assemble context and generate an answer.
    async fn answer(&self, query: &str) -> Result<Answer>;

    /// Copy out the index for persistence.
    async fn snapshot(&self) -> IndexSnapshot;

    /// Load a previously saved index instead of re-embedding.
    async fn restore(&self, snapshot: IndexSnapshot) -> Result<()>;
}
