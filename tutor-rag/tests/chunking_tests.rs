//! Sentence-aware chunking: unit scenarios and properties.

use std::path::Path;

use proptest::prelude::*;
use tutor_rag::{Chunker, DocumentRecord, FileType, SentenceChunker, split_text};

#[test]
fn short_text_is_a_single_trimmed_chunk() {
    assert_eq!(split_text("  Hello, world.  ", 500, 50), vec!["Hello, world."]);
}

#[test]
fn blank_text_yields_nothing() {
    assert!(split_text("", 500, 50).is_empty());
    assert!(split_text(" \n\t ", 500, 50).is_empty());
}

#[test]
fn cuts_land_on_sentence_endings() {
    let chunks = split_text("Sentence one. Sentence two. Sentence three.", 20, 5);

    assert_eq!(chunks, ["Sentence one.", "one. Sentence two.", "two. Sentence three", "three."]);
    // No chunk repeats text already fully covered by its predecessor.
    for pair in chunks.windows(2) {
        assert!(!pair[0].contains(pair[1].as_str()), "{:?} inside {:?}", pair[1], pair[0]);
    }
}

#[test]
fn cjk_text_is_measured_in_characters() {
    let text = "机器学习是人工智能的一个分支。它研究计算机如何从数据中学习。深度学习使用神经网络。";
    let chunks = split_text(text, 16, 2);

    assert!(chunks.len() >= 2);
    assert!(chunks.iter().all(|c| c.chars().count() <= 16));
    assert!(chunks[0].ends_with('。'));
}

#[test]
fn paged_records_become_single_chunks() {
    let path = Path::new("data/bio.pdf");
    let long_page = "Cell biology. ".repeat(100);
    let records = vec![
        DocumentRecord::page(path, FileType::Pdf, 1, long_page.clone()),
        DocumentRecord::page(path, FileType::Pdf, 2, "   ".to_string()),
        DocumentRecord::page(path, FileType::Pdf, 3, "Mitochondria.".to_string()),
    ];

    let chunks = SentenceChunker::new(100, 10).split_documents(&records);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].content, long_page.trim());
    assert_eq!(chunks[0].metadata.page_number, 1);
    assert_eq!(chunks[1].metadata.page_number, 3);
    assert!(chunks.iter().all(|c| c.metadata.chunk_id == 0));
}

#[test]
fn unpaged_records_are_split_and_numbered() {
    let text = "Alpha beta gamma. ".repeat(20);
    let records = vec![DocumentRecord::whole(Path::new("notes.txt"), FileType::Txt, text)];

    let chunks = SentenceChunker::new(60, 10).split_documents(&records);

    assert!(chunks.len() > 1);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.metadata.chunk_id, i as u32);
        assert_eq!(chunk.metadata.page_number, 0);
        assert_eq!(chunk.metadata.filename, "notes.txt");
        assert_eq!(chunk.id(), format!("notes.txt_0_{i}"));
    }
}

fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z ]{1,12}",
            Just(". ".to_string()),
            Just("!".to_string()),
            Just("\n\n".to_string()),
            Just("。".to_string()),
            "[机器学习数据]{1,6}",
        ],
        0..120,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Chunking terminates, every chunk fits, and no chunk is blank or
    /// untrimmed.
    #[test]
    fn chunks_are_bounded_trimmed_and_non_empty(
        text in arb_text(),
        chunk_size in 1usize..200,
        overlap_ratio in 0.0f64..0.9,
    ) {
        let overlap = (chunk_size as f64 * overlap_ratio) as usize;
        let chunks = split_text(&text, chunk_size, overlap);

        for chunk in &chunks {
            prop_assert!(!chunk.is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
            prop_assert!(chunk.chars().count() <= chunk_size);
        }
    }

    /// Non-blank text that fits is returned unchanged apart from trimming.
    #[test]
    fn fitting_text_is_returned_whole(text in "[a-z .]{1,50}") {
        let chunks = split_text(&text, 50, 10);
        if text.trim().is_empty() {
            prop_assert!(chunks.is_empty());
        } else {
            prop_assert_eq!(chunks, vec![text.trim().to_string()]);
        }
    }
}
