//! Generator trait for producing answers from assembled prompts.

use async_trait::async_trait;

use crate::error::Result;
use crate::prompt::GenerationRequest;

/// A text-generation backend that answers a [`GenerationRequest`].
///
/// Implementations make exactly one attempt per call. Timeouts and
/// connection failures are returned to the caller as
/// [`RagError::GenerationTimeout`](crate::RagError::GenerationTimeout) and
/// [`RagError::GenerationUnavailable`](crate::RagError::GenerationUnavailable);
/// any retry policy belongs to the caller.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{Generator, OllamaGenerator, prompt};
///
/// let generator = OllamaGenerator::new("llama3:latest");
/// let request = prompt::assemble(policy, &chunks, "What is the capital of France?");
/// let answer = generator.generate(&request).await?;
/// ```
#[async_trait]
pub trait Generator: Send + Sync {
    /// A short name identifying the backend and model, used in logs.
    fn name(&self) -> &str;

    /// Produce an answer for `request`.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}
