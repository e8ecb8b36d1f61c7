//! Property tests for fixed-size chunking.

use docqa_rag::chunking::{Chunker, FixedSizeChunker};
use docqa_rag::document::Document;
use proptest::prelude::*;

/// Chunk sizing with `0 < overlap < size`.
fn arb_sizing() -> impl Strategy<Value = (usize, usize)> {
    (2usize..40).prop_flat_map(|size| (Just(size), 1..size))
}

/// Mixed ASCII and multi-byte text.
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof!["[a-z .,]{0,300}", "\\PC{0,200}"]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn chunking_is_deterministic((size, overlap) in arb_sizing(), text in arb_text()) {
        let chunker = FixedSizeChunker::new(size, overlap).unwrap();
        let doc = Document::new("doc", text);
        prop_assert_eq!(chunker.chunk(&doc), chunker.chunk(&doc));
    }

    #[test]
    fn offsets_match_text_and_respect_size((size, overlap) in arb_sizing(), text in arb_text()) {
        let chunker = FixedSizeChunker::new(size, overlap).unwrap();
        let doc = Document::new("doc", text.clone());
        for chunk in chunker.chunk(&doc) {
            prop_assert_eq!(&text[chunk.start..chunk.end], chunk.text.as_str());
            prop_assert!(!chunk.text.is_empty());
            prop_assert!(chunk.text.chars().count() <= size);
        }
    }

    #[test]
    fn dropping_overlaps_reconstructs_text((size, overlap) in arb_sizing(), text in arb_text()) {
        let chunker = FixedSizeChunker::new(size, overlap).unwrap();
        let chunks = chunker.chunk(&Document::new("doc", text.clone()));

        let mut rebuilt = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                rebuilt.push_str(&chunk.text);
            } else {
                rebuilt.extend(chunk.text.chars().skip(overlap));
            }
        }
        prop_assert_eq!(rebuilt, text);
    }

    #[test]
    fn adjacent_chunks_share_exact_overlap((size, overlap) in arb_sizing(), text in arb_text()) {
        let chunker = FixedSizeChunker::new(size, overlap).unwrap();
        let chunks = chunker.chunk(&Document::new("doc", text));

        for pair in chunks.windows(2) {
            let a: Vec<char> = pair[0].text.chars().collect();
            let b: Vec<char> = pair[1].text.chars().collect();
            prop_assert!(b.len() > overlap, "later chunk must extend past the overlap");
            prop_assert_eq!(&a[a.len() - overlap..], &b[..overlap]);
        }
    }

    #[test]
    fn text_shorter_than_size_is_one_chunk((size, overlap) in arb_sizing(), text in "[a-z]{1,39}") {
        prop_assume!(text.chars().count() <= size);
        let chunker = FixedSizeChunker::new(size, overlap).unwrap();
        let chunks = chunker.chunk(&Document::new("doc", text.clone()));
        prop_assert_eq!(chunks.len(), 1);
        prop_assert_eq!(&chunks[0].text, &text);
    }
}

#[test]
fn chunk_ids_and_metadata_follow_document() {
    let mut doc = Document::new("notes.md", "abcdefghij");
    doc.metadata.insert("file_path".to_string(), "data/notes.md".to_string());

    let chunks = FixedSizeChunker::new(4, 2).unwrap().chunk(&doc);
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["notes.md_0", "notes.md_1", "notes.md_2", "notes.md_3"]);
    for chunk in &chunks {
        assert_eq!(chunk.document_id, "notes.md");
        assert_eq!(chunk.metadata.get("file_path").map(String::as_str), Some("data/notes.md"));
    }
}
