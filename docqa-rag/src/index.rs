//! Immutable in-memory vector index using cosine similarity.
//!
//! A [`VectorIndex`] is built in one step from the chunks of a full document
//! load and never changes afterwards. Reloading produces a brand new index;
//! callers swap the handle they hold instead of mutating entries in place.

use std::collections::HashSet;

use tracing::{debug, error, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// A stored chunk together with its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// The vector embedding for the chunk's text.
    pub embedding: Vec<f32>,
    /// The chunk the embedding was computed from.
    pub chunk: Chunk,
}

/// An immutable set of embedded chunks answering nearest-neighbour queries.
///
/// Entries keep their build order, which doubles as the tie-break order
/// when two chunks score the same.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorIndex {
    /// Embed every chunk and assemble an index from the results.
    ///
    /// The build is all-or-nothing: if the provider fails on any chunk, the
    /// error is returned and no index is produced.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if two chunks share an id
    /// - [`RagError::EmbeddingError`] if the provider fails, returns the
    ///   wrong number of vectors, or returns vectors of differing dimension
    pub async fn build(chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> Result<Self> {
        ensure_unique_ids(&chunks)?;

        if chunks.is_empty() {
            info!(chunk_count = 0, "built empty vector index");
            return Ok(Self { entries: Vec::new(), dimensions: embedder.dimensions() });
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        debug!(chunk_count = texts.len(), "embedding chunks");
        let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
            error!(error = %e, "embedding failed during index build");
            e
        })?;

        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingError {
                provider: "index".to_string(),
                message: format!(
                    "expected {} embeddings, provider returned {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexEntry { embedding, chunk })
            .collect();

        let index = Self::from_entries(entries)?;
        info!(chunk_count = index.len(), dimensions = index.dimensions, "built vector index");
        Ok(index)
    }

    /// Assemble an index from pre-computed entries.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if two entries share a chunk id
    /// - [`RagError::EmbeddingError`] if embeddings are empty or of differing dimension
    pub fn from_entries(entries: Vec<IndexEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            return Ok(Self::default());
        };
        let dimensions = first.embedding.len();
        if dimensions == 0 {
            return Err(RagError::EmbeddingError {
                provider: "index".to_string(),
                message: format!("chunk '{}' has an empty embedding", first.chunk.id),
            });
        }
        if let Some(bad) = entries.iter().find(|e| e.embedding.len() != dimensions) {
            return Err(RagError::EmbeddingError {
                provider: "index".to_string(),
                message: format!(
                    "chunk '{}' has a {}-dimensional embedding, expected {dimensions}",
                    bad.chunk.id,
                    bad.embedding.len()
                ),
            });
        }
        let ids = entries.iter().map(|e| &e.chunk);
        ensure_unique_ids(ids)?;

        Ok(Self { entries, dimensions })
    }

    /// Number of stored chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality of the stored vectors.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The stored entries in build order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Return the `k` chunks most similar to `embedding`, best first.
    ///
    /// Scores are cosine similarities. Equal scores keep build order. `k`
    /// larger than the index is clamped, and an empty index returns an
    /// empty result.
    ///
    /// # Errors
    ///
    /// - [`RagError::ConfigError`] if `k == 0`
    /// - [`RagError::DimensionMismatch`] if `embedding` does not match the index
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if embedding.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }

        let mut scored: Vec<SearchResult> = self
            .entries
            .iter()
            .map(|entry| SearchResult {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.embedding, embedding),
            })
            .collect();

        // `sort_by` is stable, so equal scores stay in build order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

fn ensure_unique_ids<'a>(chunks: impl IntoIterator<Item = &'a Chunk>) -> Result<()> {
    let mut seen = HashSet::new();
    for chunk in chunks {
        if !seen.insert(chunk.id.as_str()) {
            return Err(RagError::ConfigError(format!("duplicate chunk id '{}'", chunk.id)));
        }
    }
    Ok(())
}
