//! Plain-text rendering of answers, comparisons and inspections.

use rag_arena::{Answer, ArenaConfig, ChunkRecord, Comparison, Document, Record, SentenceRecord};

const WIDTH: usize = 80;

fn separator(c: char) {
    println!("{}", c.to_string().repeat(WIDTH));
}

fn section(title: &str) {
    separator('=');
    println!("  {title}");
    separator('=');
    println!();
}

/// First `max` characters of `text`, with an ellipsis if anything was cut.
fn preview(text: &str, max: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}

pub fn print_answer(answer: &Answer) {
    section(&format!("{} RESULTS", answer.retriever.as_str().to_uppercase()));

    println!("RESPONSE:");
    separator('-');
    println!("{}", answer.response);
    println!();

    if let Some(degraded) = &answer.retrieval.degraded {
        println!(
            "DEGRADED: {} stage after {} attempt(s): {}",
            degraded.stage, degraded.attempts, degraded.reason
        );
        println!();
    }

    println!("RETRIEVED: {}", answer.retrieval.len());
    separator('-');
    for (i, hit) in answer.retrieval.iter().enumerate() {
        println!();
        match &hit.record {
            Record::Chunk(chunk) => {
                println!("Chunk {} (Source: {}):", i + 1, chunk.source);
                println!("Similarity: {:.4}", hit.score);
                println!("{}", preview(&chunk.text, 300));
            }
            Record::Sentence(sentence) => {
                let label =
                    if answer.retrieval.is_degraded() { "Similarity" } else { "Rerank Score" };
                println!("Item {} (Source: {}):", i + 1, sentence.source);
                println!("{label}: {:.4} (vector rank {})", hit.score, hit.retrieval_rank + 1);
                println!("Sentence: {}", sentence.sentence_text);
                println!("Window: {}", preview(&sentence.window_text, 200));
            }
        }
    }
    println!();
}

pub fn print_comparison(comparison: &Comparison) {
    section("RAG ARENA: NAIVE VS ADVANCED");
    println!("QUERY:");
    println!("  \"{}\"", comparison.query);
    println!();

    print_answer(&comparison.naive);
    print_answer(&comparison.advanced);

    section("SUMMARY");
    println!("NAIVE:");
    println!("  - {} fixed-width chunks from vector search", comparison.naive.retrieval.len());
    println!("  - no reranking");
    println!();
    println!("ADVANCED:");
    println!(
        "  - {} sentence windows after reranking",
        comparison.advanced.retrieval.len()
    );
    match &comparison.advanced.retrieval.degraded {
        Some(degraded) => println!("  - reranking skipped: {}", degraded.reason),
        None => println!("  - reranked by relevance of the full window"),
    }
    println!();
}

pub fn print_inspection(
    document: &Document,
    config: &ArenaConfig,
    chunks: &[ChunkRecord],
    sentences: &[SentenceRecord],
) {
    section(&format!("INSPECT {}", document.source));
    println!("Characters: {}", document.text.chars().count());
    println!();

    println!(
        "NAIVE CHUNKS: {} (size {}, overlap {})",
        chunks.len(),
        config.naive.chunk_size,
        config.naive.chunk_overlap
    );
    separator('-');
    for chunk in chunks {
        println!("[{}] @{}: {}", chunk.chunk_index, chunk.char_offset, preview(&chunk.text, 120));
    }
    println!();

    println!(
        "SENTENCE WINDOWS: {} (radius {})",
        sentences.len(),
        config.advanced.window_radius
    );
    separator('-');
    for sentence in sentences {
        println!("[{}] {}", sentence.sentence_index, sentence.sentence_text);
        println!("     window: {}", preview(&sentence.window_text, 160));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_cuts_on_characters() {
        assert_eq!(preview("héllo wörld", 5), "héllo...");
        assert_eq!(preview("short", 10), "short");
    }
}
