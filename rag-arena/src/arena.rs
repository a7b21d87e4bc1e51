//! Side-by-side comparison of the two retrievers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ArenaConfig;
use crate::document::Document;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::generation::GenerationProvider;
use crate::reranker::RerankProvider;
use crate::retriever::{AdvancedRetriever, Answer, IndexReport, NaiveRetriever, Retriever};

/// Both answers to one question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comparison {
    /// The question asked.
    pub query: String,
    /// Answer from fixed-width chunks.
    pub naive: Answer,
    /// Answer from reranked sentence windows.
    pub advanced: Answer,
}

/// A naive and an advanced retriever over the same corpus.
pub struct Arena {
    naive: NaiveRetriever,
    advanced: AdvancedRetriever,
}

/// Capabilities shared by both retrievers of an [`Arena`].
///
/// The two generators are separate so each retriever can be given its own
/// prompt.
#[derive(Clone)]
pub struct Providers {
    /// Embeds chunks, sentences and queries.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Optional second-pass scorer for the advanced retriever.
    pub reranker: Option<Arc<dyn RerankProvider>>,
    /// Generator for naive answers.
    pub naive_generator: Arc<dyn GenerationProvider>,
    /// Generator for advanced answers.
    pub advanced_generator: Arc<dyn GenerationProvider>,
}

impl Arena {
    /// Build both retrievers from one configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
    /// for inconsistent configuration.
    pub fn new(config: &ArenaConfig, providers: Providers) -> Result<Self> {
        let naive =
            NaiveRetriever::new(config, providers.embedder.clone(), providers.naive_generator)?;
        let advanced = AdvancedRetriever::new(
            config,
            providers.embedder,
            providers.reranker,
            providers.advanced_generator,
        )?;
        Ok(Self { naive, advanced })
    }

    /// The naive retriever.
    pub fn naive(&self) -> &NaiveRetriever {
        &self.naive
    }

    /// The advanced retriever.
    pub fn advanced(&self) -> &AdvancedRetriever {
        &self.advanced
    }

    /// Index `documents` into both retrievers concurrently.
    pub async fn index_documents(
        &self,
        documents: &[Document],
    ) -> Result<(IndexReport, IndexReport)> {
        futures::try_join!(
            self.naive.index_documents(documents),
            self.advanced.index_documents(documents)
        )
    }

    /// Answer `query` with both retrievers concurrently.
    ///
    /// # Errors
    ///
    /// Fails if either retriever fails; a degraded advanced result is not a
    /// failure.
    pub async fn compare(&self, query: &str) -> Result<Comparison> {
        let (naive, advanced) =
            futures::try_join!(self.naive.answer(query), self.advanced.answer(query))?;
        info!(
            naive_hits = naive.retrieval.len(),
            advanced_hits = advanced.retrieval.len(),
            advanced_degraded = advanced.retrieval.is_degraded(),
            "compared retrievers"
        );
        Ok(Comparison { query: query.to_string(), naive, advanced })
    }
}
