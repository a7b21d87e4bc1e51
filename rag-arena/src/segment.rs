//! Sentence segmentation and sentence windows.
//!
//! [`split_sentences`] assigns every byte of the input to exactly one
//! [`Sentence`]: whitespace between two sentences belongs to the earlier one,
//! leading whitespace to the first. [`Segmenter`] then builds a window of
//! `radius` neighbours on each side of every sentence.

use std::ops::Range;

use crate::document::{Document, SentenceRecord};

const TERMINATORS: [char; 3] = ['.', '!', '?'];
const CLOSERS: [char; 6] = ['"', '\'', ')', ']', '\u{201d}', '\u{2019}'];

/// Words that end with a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "inc", "ltd", "co", "corp", "fig",
    "approx", "est", "dept", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct",
    "nov", "dec", "e.g", "i.e", "u.s", "u.k", "a.m", "p.m",
];

/// A sentence of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Position within the document.
    pub index: usize,
    /// The sentence without surrounding whitespace.
    pub text: String,
    /// Byte range this sentence owns, including trailing whitespace.
    pub span: Range<usize>,
    /// Byte range of `text` within the document.
    pub content: Range<usize>,
}

/// A sentence and the window of neighbours around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceWindow {
    /// The centre sentence.
    pub sentence: Sentence,
    /// Sentences `first..=last` as they appear in the document.
    pub window: String,
    /// Index of the first sentence in the window.
    pub first: usize,
    /// Index of the last sentence in the window.
    pub last: usize,
}

impl SentenceWindow {
    /// Number of sentences the window spans.
    pub fn sentence_count(&self) -> usize {
        self.last - self.first + 1
    }
}

/// Split `text` into sentences.
///
/// A sentence ends at `.`, `!` or `?` (optionally followed by more
/// terminators or closing quotes/brackets) when whitespace or the end of the
/// text follows, or at a blank line. A period does not end a sentence after
/// a known abbreviation or a single-letter initial, and no terminator does
/// when the next word starts lowercase. Decimals such as `3.5%` never split
/// because no whitespace follows the point.
///
/// Empty input yields no sentences. Whitespace-only input yields one
/// sentence with empty `text` that owns the whole input.
pub fn split_sentences(text: &str) -> Vec<Sentence> {
    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut starts = vec![0];
    for end in content_ends(text, &chars) {
        if let Some(next) = text[end..].find(|c: char| !c.is_whitespace()) {
            starts.push(end + next);
        }
    }

    let mut sentences = Vec::with_capacity(starts.len());
    for (index, &start) in starts.iter().enumerate() {
        let end = starts.get(index + 1).copied().unwrap_or(text.len());
        let raw = &text[start..end];
        let lead = raw.len() - raw.trim_start().len();
        let trimmed = raw.trim();
        let content_start = start + lead;
        sentences.push(Sentence {
            index,
            text: trimmed.to_string(),
            span: start..end,
            content: content_start..content_start + trimmed.len(),
        });
    }
    sentences
}

/// Byte offsets where sentence content ends, in increasing order.
fn content_ends(text: &str, chars: &[(usize, char)]) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut has_content = false;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];

        if c.is_whitespace() {
            let mut j = i;
            let mut newlines = 0;
            while j < chars.len() && chars[j].1.is_whitespace() {
                if chars[j].1 == '\n' {
                    newlines += 1;
                }
                j += 1;
            }
            if newlines >= 2 && has_content {
                ends.push(pos);
                has_content = false;
            }
            i = j;
            continue;
        }

        has_content = true;
        if TERMINATORS.contains(&c) {
            let mut j = i + 1;
            while j < chars.len()
                && (TERMINATORS.contains(&chars[j].1) || CLOSERS.contains(&chars[j].1))
            {
                j += 1;
            }
            let at_break = j == chars.len() || chars[j].1.is_whitespace();
            if at_break && !is_guarded(chars, i, j) {
                ends.push(chars.get(j).map_or(text.len(), |(p, _)| *p));
                has_content = false;
            }
            i = j;
            continue;
        }

        i += 1;
    }

    ends
}

/// Whether the terminator run `chars[i..j]` should not end a sentence.
fn is_guarded(chars: &[(usize, char)], i: usize, j: usize) -> bool {
    let next_word = chars[j..].iter().map(|(_, c)| *c).find(|c| !c.is_whitespace());
    if next_word.is_some_and(char::is_lowercase) {
        return true;
    }

    if chars[i].1 != '.' || j != i + 1 {
        return false;
    }

    let mut k = i;
    while k > 0 && (chars[k - 1].1.is_alphanumeric() || chars[k - 1].1 == '.') {
        k -= 1;
    }
    let word: String = chars[k..i].iter().map(|(_, c)| c.to_ascii_lowercase()).collect();
    let initial = word.chars().count() == 1 && chars[k].1.is_uppercase();
    initial || ABBREVIATIONS.contains(&word.as_str())
}

/// Builds sentence windows of a fixed radius.
///
/// # Example
///
/// ```rust,ignore
/// use rag_arena::Segmenter;
///
/// let windows = Segmenter::new(1).segment("One. Two. Three.");
/// assert_eq!(windows[1].window, "One. Two. Three.");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Segmenter {
    radius: usize,
}

impl Segmenter {
    /// Create a segmenter whose windows reach `radius` sentences each way.
    pub fn new(radius: usize) -> Self {
        Self { radius }
    }

    /// The configured window radius.
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Split `text` into sentences, pairing each with its window.
    ///
    /// Windows are clipped at the document edges, never padded.
    pub fn segment(&self, text: &str) -> Vec<SentenceWindow> {
        let sentences = split_sentences(text);
        let n = sentences.len();
        let windows: Vec<(usize, usize)> = (0..n)
            .map(|i| (i.saturating_sub(self.radius), i.saturating_add(self.radius).min(n - 1)))
            .collect();

        sentences
            .iter()
            .zip(windows)
            .map(|(sentence, (first, last))| SentenceWindow {
                sentence: sentence.clone(),
                window: text[sentences[first].content.start..sentences[last].content.end]
                    .to_string(),
                first,
                last,
            })
            .collect()
    }

    /// Segment a document into index records.
    ///
    /// Blank sentences are skipped, so whitespace-only documents have no
    /// records.
    pub fn records(&self, document: &Document) -> Vec<SentenceRecord> {
        self.segment(&document.text)
            .into_iter()
            .filter(|w| !w.sentence.text.is_empty())
            .map(|w| SentenceRecord {
                sentence_text: w.sentence.text,
                window_text: w.window,
                source: document.source.clone(),
                sentence_index: w.sentence.index,
            })
            .collect()
    }
}
