//! Offline embedding provider based on feature hashing.
//!
//! [`HashingEmbeddingProvider`] needs no model or network: each content word
//! of the input is hashed into one of `dimensions` buckets and the resulting
//! term-frequency vector is L2-normalised. Texts that share vocabulary score
//! high under cosine similarity, which is enough for local smoke runs and
//! for tests.

use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::Result;

/// Default dimensionality of hashed embeddings.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 256;

/// Words ignored when comparing questions with context text.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does", "for", "from",
    "has", "have", "how", "i", "in", "is", "it", "its", "of", "on", "or", "that", "the", "this",
    "to", "was", "were", "what", "when", "where", "which", "who", "why", "will", "with", "you",
];

/// Split text into lowercase alphanumeric words, dropping stopwords.
pub(crate) fn content_terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
        .collect()
}

/// A deterministic, dependency-free [`EmbeddingProvider`].
#[derive(Debug, Clone)]
pub struct HashingEmbeddingProvider {
    dimensions: usize,
}

impl HashingEmbeddingProvider {
    /// Create a provider producing vectors with `dimensions` entries.
    ///
    /// A dimension of zero is bumped to one so vectors are never empty.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn bucket(&self, term: &str) -> usize {
        let hash = term
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |acc, b| (acc ^ u64::from(b)).wrapping_mul(0x100_0000_01b3));
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSIONS)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for term in content_terms(text) {
            embedding[self.bucket(&term)] += 1.0;
        }
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            embedding.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_terms_drop_stopwords_and_punctuation() {
        assert_eq!(
            content_terms("What is the capital of France?"),
            vec!["capital".to_string(), "france".to_string()]
        );
    }

    #[tokio::test]
    async fn embeddings_are_deterministic_and_normalised() {
        let provider = HashingEmbeddingProvider::new(64);
        let a = provider.embed("Paris is the capital of France.").await.unwrap();
        let b = provider.embed("Paris is the capital of France.").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn stopword_only_text_embeds_to_zero_vector() {
        let provider = HashingEmbeddingProvider::new(8);
        let v = provider.embed("what is the").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
