//! Data types for documents, index records, and retrieval results.

use serde::{Deserialize, Serialize};

use crate::error::Stage;

/// A source document: raw text plus the label it was loaded under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    /// File name or other label identifying the document. Record ids are
    /// derived from it, so it must be unique within a corpus.
    pub source: String,
    /// The full text content.
    pub text: String,
}

impl Document {
    /// Create a document from a source label and its text.
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source: source.into(), text: text.into() }
    }
}

/// A fixed-width span of a document, indexed by the naive retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// The chunk text; this is what gets embedded.
    pub text: String,
    /// Source of the parent [`Document`].
    pub source: String,
    /// Offset of the first character, counted in characters.
    pub char_offset: usize,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

/// A sentence with its surrounding window, indexed by the advanced retriever.
///
/// Only `sentence_text` is embedded. `window_text` is the payload delivered
/// to reranking and generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentenceRecord {
    /// The matched sentence.
    pub sentence_text: String,
    /// The sentence with its neighbours, in reading order.
    pub window_text: String,
    /// Source of the parent [`Document`].
    pub source: String,
    /// Position of the sentence within its document.
    pub sentence_index: usize,
}

/// A unit stored in the [`EmbeddingIndex`](crate::index::EmbeddingIndex).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    /// Naive path.
    Chunk(ChunkRecord),
    /// Advanced path.
    Sentence(SentenceRecord),
}

impl Record {
    /// Stable identity used for de-duplication inside the index.
    pub fn id(&self) -> String {
        match self {
            Record::Chunk(c) => format!("{}#chunk-{}", c.source, c.chunk_index),
            Record::Sentence(s) => format!("{}#sentence-{}", s.source, s.sentence_index),
        }
    }

    /// The text that similarity search matches against.
    pub fn embedding_text(&self) -> &str {
        match self {
            Record::Chunk(c) => &c.text,
            Record::Sentence(s) => &s.sentence_text,
        }
    }

    /// The text delivered to reranking and generation.
    pub fn context_text(&self) -> &str {
        match self {
            Record::Chunk(c) => &c.text,
            Record::Sentence(s) => &s.window_text,
        }
    }

    /// Source label of the parent document.
    pub fn source(&self) -> &str {
        match self {
            Record::Chunk(c) => &c.source,
            Record::Sentence(s) => &s.source,
        }
    }
}

impl From<ChunkRecord> for Record {
    fn from(value: ChunkRecord) -> Self {
        Record::Chunk(value)
    }
}

impl From<SentenceRecord> for Record {
    fn from(value: SentenceRecord) -> Self {
        Record::Sentence(value)
    }
}

/// A retrieved [`Record`] paired with its score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hit {
    /// The retrieved record.
    pub record: Record,
    /// Similarity or rerank relevance, higher is more relevant.
    pub score: f32,
    /// Zero-based rank the record had in vector search.
    pub retrieval_rank: usize,
}

/// Why a result was produced through a fallback path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Degradation {
    /// The stage that did not run as designed.
    pub stage: Stage,
    /// Attempts made before falling back; zero if the stage was never tried.
    pub attempts: u32,
    /// Human-readable cause.
    pub reason: String,
}

/// Ordered hits returned by a retriever, strongest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    /// Hits in descending score order.
    pub hits: Vec<Hit>,
    /// Set when the result came from a fallback rather than the full pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<Degradation>,
}

impl RetrievalResult {
    /// Wrap hits produced by the full pipeline.
    pub fn complete(hits: Vec<Hit>) -> Self {
        Self { hits, degraded: None }
    }

    /// Whether a fallback path produced this result.
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no hits were retrieved.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterate over the hits in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Hit> {
        self.hits.iter()
    }
}

/// Sort hits by descending score, keeping the current order among equal scores.
pub(crate) fn sort_hits(hits: &mut [Hit]) {
    // slice::sort_by is stable, which is what keeps the tie-break.
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(index: usize) -> Record {
        SentenceRecord {
            sentence_text: format!("Sentence {index}."),
            window_text: format!("Before. Sentence {index}. After."),
            source: "10q.txt".into(),
            sentence_index: index,
        }
        .into()
    }

    #[test]
    fn sentence_records_embed_the_sentence_and_deliver_the_window() {
        let record = sentence(4);
        assert_eq!(record.embedding_text(), "Sentence 4.");
        assert_eq!(record.context_text(), "Before. Sentence 4. After.");
        assert_eq!(record.id(), "10q.txt#sentence-4");
    }

    #[test]
    fn ties_keep_their_incoming_order() {
        let mut hits: Vec<Hit> = [0.2, 0.9, 0.2, 0.5]
            .into_iter()
            .enumerate()
            .map(|(rank, score)| Hit { record: sentence(rank), score, retrieval_rank: rank })
            .collect();
        sort_hits(&mut hits);
        let ranks: Vec<usize> = hits.iter().map(|h| h.retrieval_rank).collect();
        assert_eq!(ranks, vec![1, 3, 0, 2]);
    }
}
