//! Second-pass relevance scoring of a candidate set.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RetryConfig;
use crate::document::Hit;
use crate::error::{RagError, Result, Stage};
use crate::retry::RetryPolicy;

/// Relevance of one candidate, addressed by its position in the request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    /// Position of the candidate in the `documents` slice.
    pub index: usize,
    /// Relevance to the query, higher is more relevant.
    pub score: f32,
}

/// An external cross-encoder style relevance scorer.
///
/// Implementations make exactly one attempt per call; [`Reranker`] applies
/// retries and timeouts. Candidates missing from the response are treated as
/// not relevant and dropped, as long as enough remain to fill the request.
#[async_trait]
pub trait RerankProvider: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &str;

    /// Score every document against the query.
    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<RelevanceScore>>;
}

/// Reorders retrieval candidates by an external relevance score.
///
/// Scores are computed on each candidate's
/// [`context_text`](crate::Record::context_text), which for sentence records
/// is the window rather than the matched sentence.
#[derive(Clone)]
pub struct Reranker {
    provider: Arc<dyn RerankProvider>,
    retry: RetryPolicy,
}

impl Reranker {
    /// Wrap a provider with the given retry policy.
    pub fn new(provider: Arc<dyn RerankProvider>, retry: RetryConfig) -> Self {
        Self { provider, retry: RetryPolicy::new(retry, Stage::Rerank) }
    }

    /// Name of the underlying provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Return the `k` most relevant candidates, strongest first.
    ///
    /// Equal scores keep the candidates' incoming order. Each returned hit
    /// keeps its `retrieval_rank` and carries the rerank score.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RerankUnavailable`] when the provider keeps
    /// failing, answers with indices outside the candidate set, or scores
    /// fewer than `min(k, candidates.len())` distinct candidates.
    pub async fn rerank(&self, query: &str, candidates: &[Hit], k: usize) -> Result<Vec<Hit>> {
        if candidates.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = candidates.iter().map(|h| h.record.context_text()).collect();
        let documents = texts.as_slice();
        let provider = self.provider.as_ref();
        let scores = self
            .retry
            .run(|| async move {
                let scores = provider.score(query, documents).await?;
                if let Some(bad) = scores.iter().find(|s| s.index >= documents.len()) {
                    return Err(RagError::RerankerError {
                        reranker: provider.name().to_string(),
                        message: format!(
                            "score for index {} but only {} candidates were sent",
                            bad.index,
                            documents.len()
                        ),
                    });
                }
                let mut seen = HashSet::new();
                let ranked: Vec<(usize, f32)> = scores
                    .into_iter()
                    .filter(|s| seen.insert(s.index))
                    .map(|s| (s.index, s.score))
                    .collect();
                let needed = k.min(documents.len());
                if ranked.len() < needed {
                    return Err(RagError::RerankerError {
                        reranker: provider.name().to_string(),
                        message: format!(
                            "scored {} of {} candidates, {needed} needed",
                            ranked.len(),
                            documents.len()
                        ),
                    });
                }
                Ok(ranked)
            })
            .await?;

        let mut ranked = scores;
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);

        debug!(
            reranker = provider.name(),
            candidates = candidates.len(),
            kept = ranked.len(),
            "reranked candidates"
        );

        Ok(ranked
            .into_iter()
            .map(|(position, score)| Hit { score, ..candidates[position].clone() })
            .collect())
    }
}
