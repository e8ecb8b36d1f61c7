//! Question retrieval against a built [`VectorIndex`].

use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;

/// Embed `question` and return the `k` best-matching chunks with their scores.
///
/// The readiness check happens before the question is embedded, so asking
/// without an index never spends an embedding call.
///
/// # Errors
///
/// - [`RagError::IndexNotReady`] if `index` is `None`
/// - [`RagError::DimensionMismatch`] if `embedder` is not the one the index was built with
/// - any error returned by the embedder
pub async fn retrieve_scored(
    question: &str,
    index: Option<&VectorIndex>,
    embedder: &dyn EmbeddingProvider,
    k: usize,
) -> Result<Vec<SearchResult>> {
    let index = index.ok_or(RagError::IndexNotReady)?;

    debug!(question_len = question.len(), "embedding question");
    let query_embedding = embedder.embed(question).await?;
    let results = index.query(&query_embedding, k)?;

    info!(
        result_count = results.len(),
        top_score = results.first().map(|r| r.score),
        "retrieval completed"
    );
    Ok(results)
}

/// Embed `question` and return the `k` best-matching chunks, best first.
///
/// Same contract as [`retrieve_scored`], with the scores discarded.
pub async fn retrieve(
    question: &str,
    index: Option<&VectorIndex>,
    embedder: &dyn EmbeddingProvider,
    k: usize,
) -> Result<Vec<Chunk>> {
    let results = retrieve_scored(question, index, embedder, k).await?;
    Ok(results.into_iter().map(|r| r.chunk).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::hashing::HashingEmbeddingProvider;

    /// Counts `embed` calls and delegates to a hashing provider.
    struct CountingEmbedder {
        inner: HashingEmbeddingProvider,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self { inner: HashingEmbeddingProvider::default(), calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.inner.dimensions()
        }
    }

    fn chunk(id: &str, text: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            start: 0,
            end: text.len(),
            metadata: HashMap::new(),
            document_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn missing_index_fails_before_embedding() {
        let embedder = CountingEmbedder::new();

        let err = retrieve("What is the capital of France?", None, &embedder, 2).await.unwrap_err();
        assert!(matches!(err, RagError::IndexNotReady));
        let err = retrieve_scored("anything?", None, &embedder, 2).await.unwrap_err();
        assert!(matches!(err, RagError::IndexNotReady));

        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retrieve_matches_scored_order() {
        let embedder = CountingEmbedder::new();
        let chunks = vec![
            chunk("de", "Berlin is the capital of Germany."),
            chunk("fr", "Paris is the capital of France."),
            chunk("it", "Rome has ancient ruins."),
        ];
        let index = VectorIndex::build(chunks, &embedder).await.unwrap();
        let question = "What is the capital of France?";

        let scored = retrieve_scored(question, Some(&index), &embedder, 3).await.unwrap();
        let plain = retrieve(question, Some(&index), &embedder, 3).await.unwrap();

        let scored_ids: Vec<&str> = scored.iter().map(|r| r.chunk.id.as_str()).collect();
        let plain_ids: Vec<&str> = plain.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(plain_ids, scored_ids);
        assert_eq!(plain_ids[0], "fr");
    }
}
