//! Offline generator that answers only with sentences copied from the context.
//!
//! [`ExtractiveGenerator`] follows the grounding policy mechanically: it
//! returns the first context sentence that mentions every content word of
//! the question, and the refusal phrase otherwise. It never produces text
//! that is not already in the context.

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::generation::Generator;
use crate::hashing::content_terms;
use crate::prompt::{GenerationRequest, REFUSAL_PHRASE};

/// A policy-compliant [`Generator`] that needs no model.
#[derive(Debug, Clone)]
pub struct ExtractiveGenerator {
    refusal: String,
}

impl ExtractiveGenerator {
    /// Create a generator that refuses with [`REFUSAL_PHRASE`].
    pub fn new() -> Self {
        Self { refusal: REFUSAL_PHRASE.to_string() }
    }

    /// Use a different refusal phrase, for policies that override the default.
    pub fn with_refusal(mut self, refusal: impl Into<String>) -> Self {
        self.refusal = refusal.into();
        self
    }
}

impl Default for ExtractiveGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Split context into sentences, skipping chunk labels.
fn sentences(context: &str) -> Vec<&str> {
    let mut out = Vec::new();
    for line in context.lines().filter(|l| !l.starts_with("file_path:")) {
        let mut start = 0;
        for (i, c) in line.char_indices() {
            if matches!(c, '.' | '!' | '?') {
                let end = i + c.len_utf8();
                out.push(line[start..end].trim());
                start = end;
            }
        }
        out.push(line[start..].trim());
    }
    out.retain(|s| !s.is_empty());
    out
}

#[async_trait]
impl Generator for ExtractiveGenerator {
    fn name(&self) -> &str {
        "extractive"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let wanted: HashSet<String> = content_terms(&request.question).into_iter().collect();
        if wanted.is_empty() || !request.has_context() {
            debug!(generator = "extractive", "nothing to ground on, refusing");
            return Ok(self.refusal.clone());
        }

        let answer = sentences(&request.context).into_iter().find(|sentence| {
            let found: HashSet<String> = content_terms(sentence).into_iter().collect();
            wanted.is_subset(&found)
        });

        Ok(answer.map_or_else(|| self.refusal.clone(), str::to_string))
    }
}
