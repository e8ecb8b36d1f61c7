//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] coordinates the build phase (load → chunk → embed →
//! index) and the query phase (retrieve → assemble → generate) by composing
//! an [`EmbeddingProvider`], a [`Chunker`], and a [`Generator`] under one
//! immutable [`RagConfig`].
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{DirectoryLoader, ExtractiveGenerator, HashingEmbeddingProvider, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(HashingEmbeddingProvider::default()))
//!     .generator(Arc::new(ExtractiveGenerator::new()))
//!     .build()?;
//!
//! let report = pipeline.load_and_build(&DirectoryLoader::new("data")).await?;
//! let answer = pipeline.answer(Some(&report.index), "What is the capital of France?").await?;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::index::VectorIndex;
use crate::loader::DirectoryLoader;
use crate::prompt;
use crate::retriever;

/// The result of a successful build phase.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// The freshly built index.
    pub index: VectorIndex,
    /// Number of documents loaded.
    pub loaded: usize,
    /// Number of files skipped by the loader.
    pub skipped: usize,
}

impl BuildReport {
    /// Number of chunks in the built index.
    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }
}

/// A grounded answer together with the chunks it was generated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    /// The generated answer text.
    pub text: String,
    /// The retrieved chunks, best first.
    pub sources: Vec<SearchResult>,
}

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    generator: Arc<dyn Generator>,
}

impl std::fmt::Debug for RagPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagPipeline")
            .field("config", &self.config)
            .field("dimensions", &self.embedding_provider.dimensions())
            .field("generator", &self.generator.name())
            .finish()
    }
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedding_provider
    }

    /// Return a reference to the generator.
    pub fn generator(&self) -> &Arc<dyn Generator> {
        &self.generator
    }

    /// Split documents into chunks, in document order.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunker.chunk(document)).collect()
    }

    /// Chunk and embed `documents` into a new index.
    ///
    /// # Errors
    ///
    /// Returns the embedding or index error that aborted the build.
    pub async fn build_index(&self, documents: &[Document]) -> Result<VectorIndex> {
        let chunks = self.chunk_documents(documents);
        let chunk_count = chunks.len();
        let index = VectorIndex::build(chunks, self.embedding_provider.as_ref()).await.map_err(
            |e| {
                error!(document_count = documents.len(), chunk_count, error = %e, "index build failed");
                e
            },
        )?;
        info!(document_count = documents.len(), chunk_count, "index built");
        Ok(index)
    }

    /// Run the whole build phase against a directory.
    ///
    /// # Errors
    ///
    /// - [`RagError::LoadError`] if nothing could be loaded
    /// - any error from [`build_index`](Self::build_index)
    pub async fn load_and_build(&self, loader: &DirectoryLoader) -> Result<BuildReport> {
        let report = loader.load()?;
        let index = self.build_index(&report.documents).await?;
        Ok(BuildReport { index, loaded: report.loaded(), skipped: report.skipped })
    }

    /// Retrieve the configured `top_k` chunks for `question`.
    ///
    /// # Errors
    ///
    /// See [`retriever::retrieve_scored`].
    pub async fn retrieve(
        &self,
        index: Option<&VectorIndex>,
        question: &str,
    ) -> Result<Vec<SearchResult>> {
        retriever::retrieve_scored(
            question,
            index,
            self.embedding_provider.as_ref(),
            self.config.top_k,
        )
        .await
    }

    /// Answer `question` from `index`: retrieve → assemble → generate.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotReady`] if `index` is `None`
    /// - retrieval errors, see [`retriever::retrieve_scored`]
    /// - [`RagError::GenerationTimeout`] if the generator does not finish
    ///   within [`RagConfig::generation_timeout`]
    /// - [`RagError::GenerationUnavailable`] or [`RagError::Generation`] from the generator
    pub async fn answer(&self, index: Option<&VectorIndex>, question: &str) -> Result<Answer> {
        let sources = self.retrieve(index, question).await?;
        let chunks: Vec<Chunk> = sources.iter().map(|r| r.chunk.clone()).collect();
        let request = prompt::assemble(&self.config.grounding_policy, &chunks, question);

        let timeout = self.config.generation_timeout;
        let text = tokio::time::timeout(timeout, self.generator.generate(&request))
            .await
            .map_err(|_| {
                error!(
                    generator = self.generator.name(),
                    timeout_secs = timeout.as_secs(),
                    "generation timed out"
                );
                RagError::GenerationTimeout { timeout }
            })??;
        info!(
            generator = self.generator.name(),
            source_count = sources.len(),
            answer_len = text.len(),
            "answer generated"
        );
        Ok(Answer { text, sources })
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config` defaults to [`RagConfig::default()`] and `chunker` to a
/// [`FixedSizeChunker`] sized from the config. The embedding provider and
/// generator are required.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    generator: Option<Arc<dyn Generator>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Replace the default fixed-size chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`RagPipeline`], validating the config and required components.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the config is invalid or a
    /// required component is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::ConfigError("generator is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::from_config(&config)?),
        };

        Ok(RagPipeline { config, embedding_provider, chunker, generator })
    }
}
