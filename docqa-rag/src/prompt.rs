//! Prompt assembly under a strict grounding policy.
//!
//! The assembler never decides whether an answer exists. It packages the
//! policy, the retrieved context, and the question so the generator sees the
//! same contract whether zero or many chunks were retrieved.

use serde::{Deserialize, Serialize};

use crate::document::Chunk;

/// The literal phrase a generator must reply with when the context lacks the answer.
pub const REFUSAL_PHRASE: &str = "I cannot answer this based on the provided document.";

/// The default system instruction enforcing grounded answers.
pub const DEFAULT_GROUNDING_POLICY: &str = "You are a strict, factual AI assistant. \
You must ONLY use the provided document context to answer the user's question. \
If the answer is not explicitly written in the document, you must reply: \
'I cannot answer this based on the provided document.' \
Do NOT guess, do NOT infer, and do NOT use your outside training knowledge.";

const CONTEXT_RULE: &str = "---------------------";

/// A fully assembled request for a [`Generator`](crate::Generator).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    /// The grounding policy, sent as the system message.
    pub system_policy: String,
    /// Retrieved chunk texts joined in retrieval order; empty when nothing was retrieved.
    pub context: String,
    /// The user's question, verbatim.
    pub question: String,
}

impl GenerationRequest {
    /// Whether the request carries no retrieved context.
    pub fn has_context(&self) -> bool {
        !self.context.trim().is_empty()
    }

    /// Render the user message: context block followed by the question.
    pub fn user_prompt(&self) -> String {
        format!(
            "Context information is below.\n{CONTEXT_RULE}\n{}\n{CONTEXT_RULE}\n\
             Given the context information and not prior knowledge, answer the query.\n\
             Query: {}\nAnswer: ",
            self.context, self.question
        )
    }
}

/// Build the context block for `chunks`, preserving their order.
///
/// Each chunk is preceded by a `file_path:` line when it carries that
/// metadata, and chunks are separated by a blank line.
pub fn context_block(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| match chunk.metadata.get("file_path") {
            Some(path) => format!("file_path: {path}\n\n{}", chunk.text),
            None => chunk.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Combine the policy, retrieved chunks, and question into one request.
pub fn assemble(system_policy: &str, chunks: &[Chunk], question: &str) -> GenerationRequest {
    GenerationRequest {
        system_policy: system_policy.to_string(),
        context: context_block(chunks),
        question: question.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn chunk(id: &str, text: &str, path: Option<&str>) -> Chunk {
        let mut metadata = HashMap::new();
        if let Some(path) = path {
            metadata.insert("file_path".to_string(), path.to_string());
        }
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            start: 0,
            end: text.len(),
            metadata,
            document_id: "doc".to_string(),
        }
    }

    #[test]
    fn default_policy_contains_refusal_phrase() {
        assert!(DEFAULT_GROUNDING_POLICY.contains(REFUSAL_PHRASE));
    }

    #[test]
    fn context_keeps_retrieval_order() {
        let chunks = vec![chunk("b", "second", None), chunk("a", "first", None)];
        let request = assemble(DEFAULT_GROUNDING_POLICY, &chunks, "q?");
        assert_eq!(request.context, "second\n\nfirst");
        assert_eq!(request.question, "q?");
        assert_eq!(request.system_policy, DEFAULT_GROUNDING_POLICY);
    }

    #[test]
    fn file_path_metadata_labels_chunks() {
        let chunks = vec![chunk("a", "Paris is the capital of France.", Some("data/fr.txt"))];
        let request = assemble("policy", &chunks, "q");
        assert!(request.context.starts_with("file_path: data/fr.txt\n\n"));
    }

    #[test]
    fn empty_retrieval_keeps_policy_and_empty_context() {
        let request = assemble(DEFAULT_GROUNDING_POLICY, &[], "What is the capital of Germany?");
        assert!(!request.has_context());
        assert_eq!(request.system_policy, DEFAULT_GROUNDING_POLICY);
        let prompt = request.user_prompt();
        assert!(prompt.contains("Query: What is the capital of Germany?"));
        assert!(prompt.contains("not prior knowledge"));
    }
}
