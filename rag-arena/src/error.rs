//! Error types for the `rag-arena` crate.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The pipeline stage an external capability call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Turning record or query text into vectors.
    Embedding,
    /// Second-pass relevance scoring of a candidate set.
    Rerank,
    /// Producing the final answer from assembled context.
    Generation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Rerank => "rerank",
            Stage::Generation => "generation",
        };
        f.write_str(name)
    }
}

/// Errors that can occur in retrieval and generation.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking, windowing or retrieval parameters are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two documents in one indexing call share a source label.
    #[error("Duplicate document source: {0}")]
    DuplicateSource(String),

    /// A query was issued before any document was indexed.
    #[error("{retriever} retriever has no indexed documents")]
    NotIndexed {
        /// Which retriever was queried.
        retriever: &'static str,
    },

    /// A single embedding call failed.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A single rerank call failed.
    #[error("Reranker error ({reranker}): {message}")]
    RerankerError {
        /// The rerank provider that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation call failed.
    #[error("Generation error ({provider}): {message}")]
    GenerationError {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An external call did not complete within its deadline.
    #[error("{stage} call timed out after {timeout:?}")]
    Timeout {
        /// The stage whose call timed out.
        stage: Stage,
        /// The configured per-call timeout.
        timeout: Duration,
    },

    /// Embedding kept failing after every retry.
    #[error("embedding unavailable after {attempts} attempt(s): {source}")]
    EmbeddingUnavailable {
        /// Number of attempts made.
        attempts: u32,
        /// The last failure observed.
        #[source]
        source: Box<RagError>,
    },

    /// Reranking kept failing after every retry.
    #[error("rerank unavailable after {attempts} attempt(s): {source}")]
    RerankUnavailable {
        /// Number of attempts made.
        attempts: u32,
        /// The last failure observed.
        #[source]
        source: Box<RagError>,
    },

    /// The generation step failed; there is no retry at this level.
    #[error("generation unavailable: {source}")]
    GenerationUnavailable {
        /// The underlying failure.
        #[source]
        source: Box<RagError>,
    },

    /// Reading documents or snapshots from disk failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An index snapshot could not be encoded, decoded or restored.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl RagError {
    /// Whether a retry of the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingError { .. }
                | RagError::RerankerError { .. }
                | RagError::GenerationError { .. }
                | RagError::Timeout { .. }
        )
    }

    /// The pipeline stage this error originated in, when it came from an
    /// external capability.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            RagError::EmbeddingError { .. } | RagError::EmbeddingUnavailable { .. } => {
                Some(Stage::Embedding)
            }
            RagError::RerankerError { .. } | RagError::RerankUnavailable { .. } => {
                Some(Stage::Rerank)
            }
            RagError::GenerationError { .. } | RagError::GenerationUnavailable { .. } => {
                Some(Stage::Generation)
            }
            RagError::Timeout { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Number of attempts made before this error was surfaced, if known.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RagError::EmbeddingUnavailable { attempts, .. }
            | RagError::RerankUnavailable { attempts, .. } => Some(*attempts),
            RagError::GenerationUnavailable { .. } => Some(1),
            _ => None,
        }
    }

    /// Wrap a final failure of `stage` after `attempts` tries into the
    /// matching `*Unavailable` variant.
    pub(crate) fn exhausted(stage: Stage, attempts: u32, last: RagError) -> Self {
        let source = Box::new(last);
        match stage {
            Stage::Embedding => RagError::EmbeddingUnavailable { attempts, source },
            Stage::Rerank => RagError::RerankUnavailable { attempts, source },
            Stage::Generation => RagError::GenerationUnavailable { source },
        }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_errors_keep_stage_and_attempts() {
        let last = RagError::Timeout { stage: Stage::Rerank, timeout: Duration::from_secs(1) };
        let err = RagError::exhausted(Stage::Rerank, 3, last);
        assert!(matches!(err, RagError::RerankUnavailable { attempts: 3, .. }));
        assert_eq!(err.stage(), Some(Stage::Rerank));
        assert_eq!(err.attempts(), Some(3));
        assert!(!err.is_retryable());
    }

    #[test]
    fn setup_errors_have_no_stage() {
        let err = RagError::InvalidConfiguration("bad".into());
        assert_eq!(err.stage(), None);
        assert!(!err.is_retryable());
        assert!(!RagError::NotIndexed { retriever: "naive" }.is_retryable());
    }
}
