//! Fixed-width character chunking for the naive baseline.
//!
//! Boundaries are purely positional. A chunk can end mid-word or mid-number;
//! that is the weakness the naive retriever exists to show.

use crate::config::validate_chunking;
use crate::document::{ChunkRecord, Document};
use crate::error::Result;

/// A positional slice of a text produced by [`chunk_text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk contents.
    pub text: String,
    /// Offset of the first character, counted in characters.
    pub char_offset: usize,
}

/// Split `text` into chunks of `chunk_size` characters sharing
/// `chunk_overlap` characters with their predecessor.
///
/// Every chunk except the last has exactly `chunk_size` characters. The last
/// one is never padded. Empty input gives an empty `Vec`.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfiguration`](crate::RagError::InvalidConfiguration)
/// if `chunk_size == 0` or `chunk_overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<TextChunk>> {
    validate_chunking(chunk_size, chunk_overlap)?;

    // Byte offset of every char boundary, plus the end of the text.
    let boundaries: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = boundaries.len() - 1;
    let step = chunk_size - chunk_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        chunks.push(TextChunk {
            text: text[boundaries[start]..boundaries[end]].to_string(),
            char_offset: start,
        });
        if end == char_count {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Splits documents into fixed-width [`ChunkRecord`]s.
///
/// # Example
///
/// ```rust,ignore
/// use rag_arena::FixedWidthChunker;
///
/// let chunker = FixedWidthChunker::new(1000, 200)?;
/// let records = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedWidthChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedWidthChunker {
    /// Create a chunker, rejecting `chunk_size == 0` and
    /// `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split a document into records tagged with its source.
    pub fn chunk(&self, document: &Document) -> Vec<ChunkRecord> {
        // Parameters were validated in `new`.
        chunk_text(&document.text, self.chunk_size, self.chunk_overlap)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(chunk_index, chunk)| ChunkRecord {
                text: chunk.text,
                source: document.source.clone(),
                char_offset: chunk.char_offset,
                chunk_index,
            })
            .collect()
    }
}
