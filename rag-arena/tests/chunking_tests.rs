//! Property tests for fixed-width chunking.

use proptest::prelude::*;
use rag_arena::{Document, FixedWidthChunker, RagError, chunk_text};

/// **Chunk tiling**
/// *For any* text and valid `(L, o)`, chunks start every `L - o` characters,
/// all but the last are exactly `L` characters, and the last one reaches the
/// end of the text.
mod prop_chunk_tiling {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn chunks_tile_with_fixed_stride(
            text in "[a-zA-Z0-9 .%é€\n]{0,300}",
            (size, overlap) in (1usize..60).prop_flat_map(|size| (Just(size), 0..size)),
        ) {
            let chars: Vec<char> = text.chars().collect();
            let chunks = chunk_text(&text, size, overlap).unwrap();

            if chars.is_empty() {
                prop_assert!(chunks.is_empty());
                return Ok(());
            }

            let step = size - overlap;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.char_offset, i * step);
                let len = chunk.text.chars().count();
                if i + 1 < chunks.len() {
                    prop_assert_eq!(len, size);
                } else {
                    prop_assert!(len >= 1 && len <= size);
                    prop_assert_eq!(chunk.char_offset + len, chars.len());
                }
                let expected: String =
                    chars[chunk.char_offset..chunk.char_offset + len].iter().collect();
                prop_assert_eq!(&chunk.text, &expected);
            }

            // Only the last chunk may reach the end of the text.
            let reaching_end = chunks
                .iter()
                .filter(|c| c.char_offset + c.text.chars().count() == chars.len())
                .count();
            prop_assert_eq!(reaching_end, 1);
        }
    }
}

#[test]
fn eleven_characters_with_size_six_and_overlap_two() {
    let chunks: Vec<String> =
        chunk_text("abcdefghijk", 6, 2).unwrap().into_iter().map(|c| c.text).collect();
    assert_eq!(chunks, vec!["abcdef", "efghij", "ijk"]);
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = chunk_text("Revenue grew 14.5%", 1000, 200).unwrap();
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, "Revenue grew 14.5%");
}

#[test]
fn overlap_larger_than_size_is_invalid() {
    assert!(matches!(chunk_text("text", 100, 150), Err(RagError::InvalidConfiguration(_))));
    assert!(matches!(FixedWidthChunker::new(0, 0), Err(RagError::InvalidConfiguration(_))));
}

#[test]
fn chunker_can_cut_through_a_figure() {
    let doc = Document::new("10q.txt", "Revenue grew 14.5% year over year.");
    let records = FixedWidthChunker::new(15, 0).unwrap().chunk(&doc);
    assert_eq!(records[0].text, "Revenue grew 14");
    assert_eq!(records[1].text, ".5% year over y");
    assert_eq!(records[1].char_offset, 15);
    assert_eq!(records[1].chunk_index, 1);
    assert!(records.iter().all(|r| r.source == "10q.txt"));
}
