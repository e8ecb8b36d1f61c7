//! # docqa-rag
//!
//! Grounded question answering over a local folder of documents.
//!
//! ## Overview
//!
//! The build phase loads every text file beneath a directory, splits each
//! document into overlapping character windows, embeds the windows, and
//! stores them in an immutable [`VectorIndex`]. The query phase embeds a
//! question, retrieves the most similar chunks by cosine similarity, and
//! asks a [`Generator`] to answer using only those chunks. When the chunks
//! do not contain the answer the generator is instructed to reply with
//! [`REFUSAL_PHRASE`].
//!
//! - [`DirectoryLoader`] - recursive text-file loader with skip accounting
//! - [`FixedSizeChunker`] - character windows with overlap
//! - [`OllamaEmbeddingProvider`] / [`HashingEmbeddingProvider`] - embedders
//! - [`VectorIndex`] - cosine top-k with insertion-order tie-break
//! - [`OllamaGenerator`] / [`ExtractiveGenerator`] - answer generators
//! - [`RagPipeline`] - build and query orchestration
//! - [`Session`] - index lifecycle and conversation history
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_rag::{DirectoryLoader, OllamaEmbeddingProvider, OllamaGenerator, RagConfig, RagPipeline, Session};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(OllamaEmbeddingProvider::new("all-minilm")))
//!     .generator(Arc::new(OllamaGenerator::new("llama3:latest")))
//!     .build()?;
//!
//! let session = Session::new(DirectoryLoader::new("data"));
//! session.reload(Arc::new(pipeline)).await?;
//! let answer = session.ask("What is the capital of France?").await?;
//! println!("{}", answer.text);
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extractive;
pub mod generation;
pub mod hashing;
pub mod index;
pub mod loader;
pub mod ollama;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod session;

pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{DEFAULT_GENERATION_TIMEOUT, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extractive::ExtractiveGenerator;
pub use generation::Generator;
pub use hashing::HashingEmbeddingProvider;
pub use index::{IndexEntry, VectorIndex};
pub use loader::{DirectoryLoader, LoadReport};
pub use ollama::{OllamaEmbeddingProvider, OllamaGenerator};
pub use pipeline::{Answer, BuildReport, RagPipeline, RagPipelineBuilder};
pub use prompt::{DEFAULT_GROUNDING_POLICY, GenerationRequest, REFUSAL_PHRASE};
pub use retriever::{retrieve, retrieve_scored};
pub use session::{ActiveIndex, ConversationTurn, IndexState, ReloadReport, Role, Session};
