//! In-memory embedding index using cosine similarity.
//!
//! [`EmbeddingIndex`] keeps records in insertion order behind a
//! `tokio::sync::RwLock`. Searches share the read lock. [`add`] embeds
//! everything first and only then takes the write lock to commit, so a
//! cancelled or failed `add` leaves the index untouched.
//!
//! [`add`]: EmbeddingIndex::add

use std::collections::HashMap;
use std::path::Path;

use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::{EmbeddingConfig, RetryConfig};
use crate::document::{Hit, Record, sort_hits};
use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::error::{RagError, Result, Stage};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
struct Entry {
    record: Record,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
    dimensions: Option<usize>,
}

impl Inner {
    /// Check `vectors` against each other, the stored vectors and the
    /// provider's `declared` dimensionality (0 when unknown).
    fn check_dimensions(
        &self,
        provider: &str,
        declared: usize,
        vectors: &[Vec<f32>],
    ) -> Result<Option<usize>> {
        let mut expected = self.dimensions;
        for vector in vectors {
            if vector.is_empty() {
                return Err(RagError::EmbeddingError {
                    provider: provider.to_string(),
                    message: "provider returned an empty vector".into(),
                });
            }
            if declared != 0 && vector.len() != declared {
                return Err(RagError::EmbeddingError {
                    provider: provider.to_string(),
                    message: format!(
                        "provider declares {declared}-d vectors, returned {}",
                        vector.len()
                    ),
                });
            }
            match expected {
                Some(d) if d != vector.len() => {
                    return Err(RagError::EmbeddingError {
                        provider: provider.to_string(),
                        message: format!(
                            "dimension mismatch: index holds {d}-d vectors, got {}",
                            vector.len()
                        ),
                    });
                }
                Some(_) => {}
                None => expected = Some(vector.len()),
            }
        }
        Ok(expected)
    }

    /// Insert or replace by record id. Returns whether the id was new.
    fn upsert(&mut self, record: Record, vector: Vec<f32>) -> bool {
        let id = record.id();
        match self.positions.get(&id) {
            Some(&pos) => {
                self.entries[pos] = Entry { record, vector };
                false
            }
            None => {
                self.positions.insert(id, self.entries.len());
                self.entries.push(Entry { record, vector });
                true
            }
        }
    }
}

/// Counts reported by [`EmbeddingIndex::add`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddReport {
    /// Records whose id was not yet indexed.
    pub inserted: usize,
    /// Records that replaced an entry with the same id.
    pub replaced: usize,
}

/// An in-memory vector index over [`Record`]s.
///
/// Re-adding a record whose [`id`](Record::id) is already present replaces
/// its vector and payload in place, keeping its original insertion slot.
/// Search ties are broken by insertion order.
///
/// # Example
///
/// ```rust,ignore
/// use rag_arena::{EmbeddingIndex, EmbeddingConfig, RetryConfig};
///
/// let index = EmbeddingIndex::new(EmbeddingConfig::default(), RetryConfig::default());
/// index.add(records, &embedder).await?;
/// let hits = index.search("What was Q1 revenue growth?", 10, &embedder).await?;
/// ```
#[derive(Debug)]
pub struct EmbeddingIndex {
    inner: RwLock<Inner>,
    embedding: EmbeddingConfig,
    retry: RetryPolicy,
}

impl EmbeddingIndex {
    /// Create an empty index.
    pub fn new(embedding: EmbeddingConfig, retry: RetryConfig) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            embedding,
            retry: RetryPolicy::new(retry, Stage::Embedding),
        }
    }

    /// Number of indexed records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Whether no record has been indexed.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    /// Dimensionality of stored vectors, once anything is indexed.
    pub async fn dimensions(&self) -> Option<usize> {
        self.inner.read().await.dimensions
    }

    /// Embed each record's [`embedding_text`](Record::embedding_text) and
    /// store it.
    ///
    /// Texts are sent in batches of `batch_size`, with up to `concurrency`
    /// batches in flight. Vectors are reassembled in input order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingUnavailable`] when a batch keeps failing,
    /// or [`RagError::EmbeddingError`] when vectors have inconsistent
    /// dimensions. Nothing is committed in either case.
    pub async fn add(
        &self,
        records: Vec<Record>,
        provider: &dyn EmbeddingProvider,
    ) -> Result<AddReport> {
        if records.is_empty() {
            return Ok(AddReport::default());
        }

        let texts: Vec<&str> = records.iter().map(Record::embedding_text).collect();
        let batch_size = self.embedding.batch_size.max(1);
        let pending: Vec<_> = texts
            .chunks(batch_size)
            .enumerate()
            .map(|(batch, texts)| self.embed_batch(provider, batch, texts))
            .collect();
        let batches: Vec<Vec<Vec<f32>>> = stream::iter(pending)
            .buffered(self.embedding.concurrency.max(1))
            .try_collect()
            .await?;
        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();

        let mut inner = self.inner.write().await;
        let dimensions = inner.check_dimensions(provider.name(), provider.dimensions(), &vectors)?;
        inner.dimensions = dimensions;

        let mut report = AddReport::default();
        for (record, vector) in records.into_iter().zip(vectors) {
            if inner.upsert(record, vector) {
                report.inserted += 1;
            } else {
                report.replaced += 1;
            }
        }

        info!(
            inserted = report.inserted,
            replaced = report.replaced,
            total = inner.entries.len(),
            "indexed records"
        );
        Ok(report)
    }

    async fn embed_batch(
        &self,
        provider: &dyn EmbeddingProvider,
        batch: usize,
        texts: &[&str],
    ) -> Result<Vec<Vec<f32>>> {
        let vectors = self
            .retry
            .run(|| async move {
                let vectors = provider.embed_batch(texts).await?;
                if vectors.len() != texts.len() {
                    return Err(RagError::EmbeddingError {
                        provider: provider.name().to_string(),
                        message: format!(
                            "expected {} vectors, provider returned {}",
                            texts.len(),
                            vectors.len()
                        ),
                    });
                }
                Ok(vectors)
            })
            .await?;
        debug!(provider = provider.name(), batch, batch_size = texts.len(), "embedded batch");
        Ok(vectors)
    }

    /// Return up to `k` records most similar to `query`, strongest first.
    ///
    /// Asking for more records than are indexed returns all of them.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingUnavailable`] if the query cannot be
    /// embedded.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        provider: &dyn EmbeddingProvider,
    ) -> Result<Vec<Hit>> {
        let vector = self.retry.run(|| provider.embed(query)).await?;
        self.search_by_vector(&vector, k).await
    }

    /// Return up to `k` records most similar to an already-embedded query.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] if `query` has a different
    /// dimensionality from the stored vectors.
    pub async fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        let inner = self.inner.read().await;
        match inner.dimensions {
            Some(d) if d != query.len() => {
                return Err(RagError::EmbeddingError {
                    provider: "query".into(),
                    message: format!("query has {} dimensions, index holds {d}", query.len()),
                });
            }
            _ => {}
        }

        let mut hits: Vec<Hit> = inner
            .entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| Hit {
                record: entry.record.clone(),
                score: cosine_similarity(&entry.vector, query),
                retrieval_rank: slot,
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(k);
        for (rank, hit) in hits.iter_mut().enumerate() {
            hit.retrieval_rank = rank;
        }
        Ok(hits)
    }

    /// Copy out every (record, vector) pair in insertion order.
    pub async fn snapshot(&self) -> IndexSnapshot {
        let inner = self.inner.read().await;
        IndexSnapshot {
            dimensions: inner.dimensions,
            entries: inner
                .entries
                .iter()
                .map(|e| SnapshotEntry { record: e.record.clone(), vector: e.vector.clone() })
                .collect(),
        }
    }

    /// Replace the index contents with a snapshot, without re-embedding.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Snapshot`] if vector lengths disagree with each
    /// other or with the recorded dimensions.
    pub async fn restore(&self, snapshot: IndexSnapshot) -> Result<()> {
        let mut rebuilt = Inner { dimensions: snapshot.dimensions, ..Inner::default() };
        let vectors: Vec<Vec<f32>> = snapshot.entries.iter().map(|e| e.vector.clone()).collect();
        rebuilt.dimensions = rebuilt
            .check_dimensions("snapshot", 0, &vectors)
            .map_err(|e| RagError::Snapshot(e.to_string()))?;
        for entry in snapshot.entries {
            rebuilt.upsert(entry.record, entry.vector);
        }

        let mut inner = self.inner.write().await;
        *inner = rebuilt;
        info!(total = inner.entries.len(), "restored index from snapshot");
        Ok(())
    }
}

/// One stored record with its vector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnapshotEntry {
    /// The stored record.
    pub record: Record,
    /// Its embedding.
    pub vector: Vec<f32>,
}

/// Serializable contents of an [`EmbeddingIndex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexSnapshot {
    /// Vector dimensionality, if any record is stored.
    pub dimensions: Option<usize>,
    /// Entries in insertion order.
    pub entries: Vec<SnapshotEntry>,
}

impl IndexSnapshot {
    /// Write the snapshot to `path` as JSON.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_vec(self).map_err(|e| RagError::Snapshot(e.to_string()))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|source| RagError::Io { path: path.to_path_buf(), source })
    }

    /// Read a snapshot written by [`save`](IndexSnapshot::save).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| RagError::Io { path: path.to_path_buf(), source })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RagError::Snapshot(format!("{}: {e}", path.display())))
    }
}
