//! # rag-arena
//!
//! Two retrieval-augmented generation pipelines over the same corpus, built
//! to be compared side by side.
//!
//! ## Overview
//!
//! - [`NaiveRetriever`] cuts documents into fixed-width, overlapping character
//!   chunks, embeds each chunk and hands the top-k most similar chunks to
//!   generation.
//! - [`AdvancedRetriever`] splits documents into sentences, embeds each
//!   sentence on its own and stores the surrounding window as payload. A query
//!   pulls the top-N sentences, a [`Reranker`] scores their windows, and the
//!   top-k windows go to generation. If reranking is unavailable the result
//!   falls back to vector order and is marked degraded.
//! - [`Arena`] runs both on one question and returns a [`Comparison`].
//!
//! Embedding, reranking and generation are capability traits
//! ([`EmbeddingProvider`], [`RerankProvider`], [`GenerationProvider`]).
//! External calls are retried with bounded exponential backoff and a per-call
//! timeout from [`RetryConfig`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rag_arena::{Arena, ArenaConfig, Providers, load_documents};
//!
//! let arena = Arena::new(&ArenaConfig::default(), Providers {
//!     embedder: Arc::new(embedder),
//!     reranker: Some(Arc::new(reranker)),
//!     naive_generator: Arc::new(naive_llm),
//!     advanced_generator: Arc::new(advanced_llm),
//! })?;
//! arena.index_documents(&load_documents("data").await?).await?;
//! let comparison = arena.compare("What was Q1 revenue growth?").await?;
//! ```
//!
//! ## Features
//!
//! - `openai`: OpenAI embeddings and chat completions
//! - `cohere`: Cohere rerank
//! - `full`: both

pub mod arena;
pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod loader;
pub mod reranker;
mod retry;
pub mod retriever;
pub mod segment;

#[cfg(feature = "cohere")]
pub mod cohere;
#[cfg(feature = "openai")]
pub mod openai;

pub use arena::{Arena, Comparison, Providers};
pub use chunking::{FixedWidthChunker, TextChunk, chunk_text};
pub use config::{
    AdvancedConfig, ArenaConfig, ArenaConfigBuilder, EmbeddingConfig, NaiveConfig, RetryConfig,
};
pub use context::{assemble_chunks, assemble_windows};
pub use document::{
    ChunkRecord, Degradation, Document, Hit, Record, RetrievalResult, SentenceRecord,
};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result, Stage};
pub use generation::{GenerationProvider, Generator, PromptTemplate};
pub use index::{AddReport, EmbeddingIndex, IndexSnapshot, SnapshotEntry};
pub use loader::load_documents;
pub use reranker::{RelevanceScore, RerankProvider, Reranker};
pub use retriever::{
    AdvancedRetriever, Answer, IndexReport, NaiveRetriever, Retriever, RetrieverKind,
    RetrieverState,
};
pub use segment::{Segmenter, Sentence, SentenceWindow, split_sentences};
