//! Sentence-aware text chunking.
//!
//! [`SentenceChunker`] walks text in windows of at most `chunk_size`
//! characters and snaps each cut back to the nearest sentence ending so a
//! chunk carries complete thoughts. Paged formats (PDF, PPTX) bypass
//! splitting in [`Chunker::split_documents`]: a page or slide is already a
//! coherent unit.

use tracing::info;

use crate::config::RagConfig;
use crate::document::{Chunk, ChunkMetadata, DocumentRecord};

/// How far (in characters) a cut may move back to reach a sentence ending.
pub const BOUNDARY_SEARCH_WINDOW: usize = 100;

/// Sentence endings in probe order. The first marker with a match inside the
/// search window decides the cut.
const SENTENCE_ENDINGS: [&str; 8] = ["。", "！", "？", ".", "!", "?", "\n\n", "\r\n\r\n"];

/// A strategy for splitting extracted text into retrievable chunks.
pub trait Chunker: Send + Sync {
    /// Split raw text into ordered, trimmed, non-empty segments.
    fn split(&self, text: &str) -> Vec<String>;

    /// Turn loader output into chunks.
    ///
    /// Paged records become exactly one chunk with `chunk_id = 0`; unpaged
    /// records are split and numbered in document order with
    /// `page_number = 0`. Blank records produce nothing.
    fn split_documents(&self, documents: &[DocumentRecord]) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for doc in documents {
            if doc.filetype.is_paged() {
                let metadata = ChunkMetadata {
                    filename: doc.filename.clone(),
                    filepath: doc.filepath.clone(),
                    filetype: doc.filetype,
                    page_number: doc.page_number,
                    chunk_id: 0,
                };
                chunks.extend(Chunk::new(&doc.content, metadata));
                continue;
            }

            let segments = self.split(&doc.content);
            chunks.extend(segments.into_iter().enumerate().filter_map(|(i, segment)| {
                let metadata = ChunkMetadata {
                    filename: doc.filename.clone(),
                    filepath: doc.filepath.clone(),
                    filetype: doc.filetype,
                    page_number: 0,
                    chunk_id: i as u32,
                };
                Chunk::new(segment, metadata)
            }));
        }

        info!(documents = documents.len(), chunks = chunks.len(), "split documents");
        chunks
    }
}

/// Splits text into overlapping windows cut at sentence boundaries.
///
/// Lengths are measured in `char`s, so CJK text is sized the same way as
/// ASCII.
///
/// # Example
///
/// ```rust
/// use tutor_rag::{Chunker, SentenceChunker};
///
/// let chunker = SentenceChunker::new(20, 5);
/// let chunks = chunker.split("Sentence one. Sentence two. Sentence three.");
/// assert!(chunks.len() >= 2);
/// assert!(chunks.iter().all(|c| c.chars().count() <= 20));
/// ```
#[derive(Debug, Clone)]
pub struct SentenceChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SentenceChunker {
    /// Create a new `SentenceChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size` - maximum number of characters per chunk
    /// * `chunk_overlap` - characters carried over between consecutive chunks;
    ///   expected to be smaller than `chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    /// Create a chunker from the sizes in a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }
}

impl Chunker for SentenceChunker {
    fn split(&self, text: &str) -> Vec<String> {
        split_text(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// See [`SentenceChunker`]. Returns an empty `Vec` for blank input and the
/// single trimmed text when it already fits.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    split_windows(&chars, chunk_size.max(1), chunk_overlap)
        .into_iter()
        .filter_map(|(start, end)| {
            let window: String = chars[start..end].iter().collect();
            let trimmed = window.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect()
}

/// Compute the `[start, end)` character windows for `chars`.
///
/// Consecutive windows overlap by up to `chunk_overlap` characters, window
/// ends strictly increase, and their union covers the whole input.
pub(crate) fn split_windows(
    chars: &[char],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<(usize, usize)> {
    let len = chars.len();
    if chars.iter().all(|c| c.is_whitespace()) {
        return Vec::new();
    }
    if len <= chunk_size {
        return vec![(0, len)];
    }

    let mut windows = Vec::new();
    let mut start = 0;
    let mut prev_end = 0;

    while start < len {
        let mut end = (start + chunk_size).min(len);

        if end < len {
            // Cuts at or before the previous end would repeat text already
            // emitted, so the search never reaches back past it.
            let search_start =
                start.max(end.saturating_sub(BOUNDARY_SEARCH_WINDOW)).max(prev_end);
            if let Some(cut) = find_sentence_end(chars, search_start, end) {
                end = cut;
            }
        }

        windows.push((start, end));
        if end == len {
            break;
        }
        prev_end = end;

        // The boundary snap can pull `end` back far enough that the overlap
        // would rewind past `start`; restart at `end` in that case.
        let next = end.saturating_sub(chunk_overlap);
        start = if next <= start { end } else { next };
    }

    windows
}

/// Find the cut position just after the last occurrence of the first
/// sentence ending that fits entirely inside `chars[lo..hi]`.
fn find_sentence_end(chars: &[char], lo: usize, hi: usize) -> Option<usize> {
    SENTENCE_ENDINGS.iter().find_map(|ending| {
        let marker: Vec<char> = ending.chars().collect();
        rfind(&chars[lo..hi], &marker).map(|pos| lo + pos + marker.len())
    })
}

fn rfind(haystack: &[char], needle: &[char]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| haystack[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn windows_cover_the_whole_text() {
        let text = chars("First sentence here. Second one follows! Third? Yes.\n\nNew paragraph.");
        let windows = split_windows(&text, 16, 4);

        assert_eq!(windows.first().map(|w| w.0), Some(0));
        assert_eq!(windows.last().map(|w| w.1), Some(text.len()));
        for pair in windows.windows(2) {
            let (prev, next) = (pair[0], pair[1]);
            assert!(next.0 > prev.0, "start must advance: {prev:?} -> {next:?}");
            assert!(next.0 <= prev.1, "gap between windows: {prev:?} -> {next:?}");
        }
    }

    #[test]
    fn cut_snaps_to_full_width_period() {
        let text =
            chars("机器学习是人工智能的一个分支。它研究计算机如何从数据中学习规律并做出预测");
        let windows = split_windows(&text, 20, 2);
        let first: String = text[windows[0].0..windows[0].1].iter().collect();
        assert_eq!(first, "机器学习是人工智能的一个分支。");
    }

    #[test]
    fn no_boundary_cuts_at_chunk_size() {
        let text = chars(&"a".repeat(45));
        let windows = split_windows(&text, 20, 5);
        assert_eq!(windows, vec![(0, 20), (15, 35), (30, 45)]);
    }

    #[test]
    fn cut_never_falls_inside_the_previous_window() {
        let text = chars("Sentence one. Sentence two. Sentence three.");
        let windows = split_windows(&text, 20, 5);
        assert_eq!(windows, vec![(0, 13), (8, 27), (22, 42), (37, 43)]);
    }

    fn arb_text() -> impl Strategy<Value = Vec<char>> {
        proptest::collection::vec(
            prop_oneof![
                "[a-z ]{1,10}",
                Just(". ".to_string()),
                Just("?".to_string()),
                Just("\n\n".to_string()),
                Just("。".to_string()),
            ],
            1..80,
        )
        .prop_map(|parts| parts.concat().chars().collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        /// Windows start at 0, end at the text length, never leave a gap,
        /// have strictly increasing ends, and rebuild the text once the
        /// overlaps are removed.
        #[test]
        fn windows_tile_the_text(
            text in arb_text(),
            chunk_size in 1usize..150,
            overlap_ratio in 0.0f64..0.9,
        ) {
            prop_assume!(!text.iter().all(|c| c.is_whitespace()));
            let overlap = (chunk_size as f64 * overlap_ratio) as usize;
            let windows = split_windows(&text, chunk_size, overlap);

            prop_assert_eq!(windows.first().map(|w| w.0), Some(0));
            prop_assert_eq!(windows.last().map(|w| w.1), Some(text.len()));
            for &(start, end) in &windows {
                prop_assert!(start < end && end - start <= chunk_size);
            }
            for pair in windows.windows(2) {
                let (prev, next) = (pair[0], pair[1]);
                prop_assert!(next.0 <= prev.1, "gap: {:?} -> {:?}", prev, next);
                prop_assert!(prev.1 < next.1, "end did not advance: {:?} -> {:?}", prev, next);
            }

            let mut rebuilt: Vec<char> = Vec::with_capacity(text.len());
            for &(start, end) in &windows {
                rebuilt.extend_from_slice(&text[start.max(rebuilt.len())..end]);
            }
            prop_assert_eq!(rebuilt, text);
        }
    }

    #[test]
    fn rfind_finds_last_occurrence() {
        assert_eq!(rfind(&chars("a.b.c"), &chars(".")), Some(3));
        assert_eq!(rfind(&chars("abc"), &chars("\n\n")), None);
        assert_eq!(rfind(&chars("x"), &chars("xyz")), None);
    }
}
