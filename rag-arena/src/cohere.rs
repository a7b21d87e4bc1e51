//! Cohere rerank provider.
//!
//! This module is only available when the `cohere` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{RagError, Result};
use crate::reranker::{RelevanceScore, RerankProvider};

const COHERE_RERANK_URL: &str = "https://api.cohere.com/v1/rerank";
const DEFAULT_MODEL: &str = "rerank-english-v3.0";
const PROVIDER: &str = "cohere";

/// A [`RerankProvider`] backed by the Cohere `/v1/rerank` endpoint.
///
/// Every document is scored (`top_n` is the number of documents sent); the
/// [`Reranker`](crate::Reranker) applies the cut-off.
///
/// # Example
///
/// ```rust,ignore
/// use rag_arena::cohere::CohereRerankProvider;
///
/// let provider = CohereRerankProvider::new(api_key)?;
/// let scores = provider.score("Q1 revenue growth", &windows).await?;
/// ```
pub struct CohereRerankProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl CohereRerankProvider {
    /// Create a provider using `rerank-english-v3.0`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::InvalidConfiguration("Cohere API key must not be empty".into()));
        }
        Ok(Self { client: reqwest::Client::new(), api_key, model: DEFAULT_MODEL.into() })
    }

    /// Set the rerank model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn failure(message: String) -> RagError {
        RagError::RerankerError { reranker: PROVIDER.into(), message }
    }
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [&'a str],
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Deserialize)]
struct RerankResult {
    index: usize,
    relevance_score: f32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: String,
}

impl From<RerankResult> for RelevanceScore {
    fn from(value: RerankResult) -> Self {
        RelevanceScore { index: value.index, score: value.relevance_score }
    }
}

#[async_trait]
impl RerankProvider for CohereRerankProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn score(&self, query: &str, documents: &[&str]) -> Result<Vec<RelevanceScore>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, documents = documents.len(), model = %self.model, "reranking");

        let body = RerankRequest {
            model: &self.model,
            query,
            documents,
            top_n: documents.len(),
        };
        let response = self
            .client
            .post(COHERE_RERANK_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                Self::failure(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.message).unwrap_or(body);
            error!(provider = PROVIDER, %status, "API error");
            return Err(Self::failure(format!("API returned {status}: {detail}")));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("failed to parse response: {e}")))?;
        Ok(parsed.results.into_iter().map(RelevanceScore::from).collect())
    }
}
