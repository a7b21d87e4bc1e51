//! Assembly of retrieved hits into the context passed to generation.

use crate::document::RetrievalResult;

const SEPARATOR: &str = "\n\n---\n\n";

/// Join chunk texts in score order, each tagged with its source.
pub fn assemble_chunks(result: &RetrievalResult) -> String {
    result
        .iter()
        .map(|hit| format!("Source: {}\n{}", hit.record.source(), hit.record.context_text()))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// Join sentence windows in score order with their source and score.
///
/// Degraded results carry vector similarities rather than rerank relevance,
/// and are labelled accordingly.
pub fn assemble_windows(result: &RetrievalResult) -> String {
    let label = if result.is_degraded() { "Similarity Score" } else { "Relevance Score" };
    result
        .iter()
        .map(|hit| {
            format!(
                "Source: {}\n{label}: {:.3}\n\n{}",
                hit.record.source(),
                hit.score,
                hit.record.context_text()
            )
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
