//! Error types for the `docqa-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building an index or answering a question.
#[derive(Debug, Error)]
pub enum RagError {
    /// A configuration validation error (chunk sizing, `top_k`, missing components).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The document source is missing or nothing in it could be loaded.
    #[error("Load error ({}): {message}", path.display())]
    LoadError {
        /// The source directory that failed to load.
        path: std::path::PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A query vector does not match the dimensionality of the index.
    ///
    /// This usually means the question was embedded with a different model
    /// than the one used to build the index.
    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, query has {actual}")]
    DimensionMismatch {
        /// Dimensionality of the stored vectors.
        expected: usize,
        /// Dimensionality of the offending query vector.
        actual: usize,
    },

    /// A question arrived before any index was successfully built.
    #[error("No index is ready yet; load documents first")]
    IndexNotReady,

    /// A reload was requested while another build is still running.
    #[error("An index build is already in progress")]
    BuildInProgress,

    /// The generation service did not answer within the configured bound.
    #[error("Generation timed out after {}s", timeout.as_secs())]
    GenerationTimeout {
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// The generation service could not be reached at all.
    #[error("Generation service unavailable ({endpoint}): {message}")]
    GenerationUnavailable {
        /// The endpoint that was contacted.
        endpoint: String,
        /// A description of the failure.
        message: String,
    },

    /// The generation service answered, but not with a usable response.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generator that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },
}

impl RagError {
    /// Whether this error means the caller should load documents before asking.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, RagError::IndexNotReady)
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
