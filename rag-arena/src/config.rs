//! Configuration for both retrievers.
//!
//! Every value is passed into constructors explicitly. Nothing here reads the
//! environment; binaries decide where the values come from.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Parameters of the fixed-width chunk baseline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NaiveConfig {
    /// Chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks handed to generation.
    pub top_k: usize,
}

impl Default for NaiveConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, top_k: 3 }
    }
}

/// Parameters of the sentence-window pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Sentences on each side of the matched sentence that form its window.
    pub window_radius: usize,
    /// Candidates pulled from vector search before reranking.
    pub top_n: usize,
    /// Windows kept after reranking.
    pub top_k: usize,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self { window_radius: 3, top_n: 10, top_k: 3 }
    }
}

/// Bounded exponential backoff applied to every external call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on each further attempt.
    pub base_delay_ms: u64,
    /// Upper bound for a single backoff delay.
    pub max_delay_ms: u64,
    /// Deadline for one call to an external capability.
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 500, max_delay_ms: 10_000, timeout_ms: 30_000 }
    }
}

impl RetryConfig {
    /// Per-call timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Backoff to wait after the failed attempt numbered `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let delay = self.base_delay_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }
}

/// How record texts are sent to the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Texts per `embed_batch` call.
    pub batch_size: usize,
    /// Batches in flight at once.
    pub concurrency: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { batch_size: 64, concurrency: 4 }
    }
}

/// Configuration for an arena of one naive and one advanced retriever.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArenaConfig {
    /// Naive retriever parameters.
    pub naive: NaiveConfig,
    /// Advanced retriever parameters.
    pub advanced: AdvancedConfig,
    /// Retry policy shared by all external calls.
    pub retry: RetryConfig,
    /// Embedding batching.
    pub embedding: EmbeddingConfig,
}

impl ArenaConfig {
    /// Create a new builder for constructing an [`ArenaConfig`].
    pub fn builder() -> ArenaConfigBuilder {
        ArenaConfigBuilder::default()
    }

    /// Check that values are mutually consistent.
    ///
    /// Deserialized configs bypass the builder, so loaders must call this.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfiguration`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - any `top_k`/`top_n` is zero, or advanced `top_k > top_n`
    /// - `max_attempts == 0`, `timeout_ms == 0` or `base_delay_ms > max_delay_ms`
    /// - embedding `batch_size` or `concurrency` is zero
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.naive.chunk_size, self.naive.chunk_overlap)?;
        if self.naive.top_k == 0 {
            return Err(invalid("naive top_k must be greater than zero"));
        }
        if self.advanced.top_n == 0 || self.advanced.top_k == 0 {
            return Err(invalid("advanced top_n and top_k must be greater than zero"));
        }
        if self.advanced.top_k > self.advanced.top_n {
            return Err(RagError::InvalidConfiguration(format!(
                "advanced top_k ({}) must not exceed top_n ({})",
                self.advanced.top_k, self.advanced.top_n
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry max_attempts must be at least 1"));
        }
        if self.retry.timeout_ms == 0 {
            return Err(invalid("retry timeout_ms must be greater than zero"));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(RagError::InvalidConfiguration(format!(
                "retry base_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.retry.base_delay_ms, self.retry.max_delay_ms
            )));
        }
        if self.embedding.batch_size == 0 || self.embedding.concurrency == 0 {
            return Err(invalid("embedding batch_size and concurrency must be at least 1"));
        }
        Ok(())
    }
}

/// Shared chunk-parameter check used by the config and the chunker.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(invalid("chunk_size must be greater than zero"));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidConfiguration(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

fn invalid(message: &str) -> RagError {
    RagError::InvalidConfiguration(message.to_string())
}

/// Builder for constructing a validated [`ArenaConfig`].
#[derive(Debug, Clone, Default)]
pub struct ArenaConfigBuilder {
    config: ArenaConfig,
}

impl ArenaConfigBuilder {
    /// Set the naive chunk length in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.naive.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive naive chunks.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.naive.chunk_overlap = overlap;
        self
    }

    /// Set how many chunks the naive retriever returns.
    pub fn naive_top_k(mut self, k: usize) -> Self {
        self.config.naive.top_k = k;
        self
    }

    /// Set the sentence-window radius.
    pub fn window_radius(mut self, radius: usize) -> Self {
        self.config.advanced.window_radius = radius;
        self
    }

    /// Set how many candidates vector search hands to the reranker.
    pub fn top_n(mut self, n: usize) -> Self {
        self.config.advanced.top_n = n;
        self
    }

    /// Set how many windows survive reranking.
    pub fn rerank_top_k(mut self, k: usize) -> Self {
        self.config.advanced.top_k = k;
        self
    }

    /// Replace the retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Replace the embedding batching parameters.
    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.config.embedding = embedding;
        self
    }

    /// Build the [`ArenaConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`ArenaConfig::validate`].
    pub fn build(self) -> Result<ArenaConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
