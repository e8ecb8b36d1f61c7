//! Command-line arguments and their mapping onto pipeline components.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docqa_rag::ollama::{
    DEFAULT_CHAT_MODEL, DEFAULT_EMBED_DIMENSIONS, DEFAULT_EMBED_MODEL, DEFAULT_OLLAMA_URL,
};
use docqa_rag::{
    DirectoryLoader, EmbeddingProvider, ExtractiveGenerator, Generator, HashingEmbeddingProvider,
    OllamaEmbeddingProvider, OllamaGenerator, RagConfig, RagPipeline,
};

/// Ask questions about a folder of documents, answered only from their contents.
#[derive(Debug, Clone, Parser)]
#[command(name = "docqa", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the documents to index.
    #[arg(short, long, env = "DOCQA_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Only load files with these extensions (comma separated, e.g. `md,txt`).
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Maximum chunk size in characters.
    #[arg(long, env = "DOCQA_CHUNK_SIZE", default_value_t = 512)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks.
    #[arg(long, env = "DOCQA_CHUNK_OVERLAP", default_value_t = 50)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question.
    #[arg(short = 'k', long, env = "DOCQA_TOP_K", default_value_t = 2)]
    pub top_k: usize,

    /// Seconds to wait for one answer from the generation model.
    #[arg(long, env = "DOCQA_TIMEOUT_SECS", default_value_t = 300)]
    pub timeout_secs: u64,

    /// Ollama generation model.
    #[arg(long, env = "DOCQA_MODEL", default_value = DEFAULT_CHAT_MODEL)]
    pub model: String,

    /// Ollama embedding model.
    #[arg(long, env = "DOCQA_EMBED_MODEL", default_value = DEFAULT_EMBED_MODEL)]
    pub embed_model: String,

    /// Output dimensionality of the embedding model.
    #[arg(long, default_value_t = DEFAULT_EMBED_DIMENSIONS)]
    pub embed_dimensions: usize,

    /// Ollama daemon URL.
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Replace the built-in grounding policy with the contents of this file.
    #[arg(long)]
    pub policy_file: Option<PathBuf>,

    /// Run without Ollama: hashed embeddings and extractive answers.
    #[arg(long)]
    pub offline: bool,

    /// Print the retrieved chunks and their scores after each answer.
    #[arg(long)]
    pub show_sources: bool,

    /// Start the console without loading documents; use `/reload` to load.
    #[arg(long)]
    pub no_load: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Non-interactive operations.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load the documents, answer one question, and exit.
    Ask {
        /// The question to answer.
        question: String,
    },
    /// Send one test message to the generation model and print the reply.
    Check {
        /// The test message.
        #[arg(long, default_value = "What is the capital of France?")]
        prompt: String,

        /// Seconds to wait for the reply.
        #[arg(long, default_value_t = 60)]
        wait_secs: u64,
    },
}

impl Cli {
    /// Build a fresh, validated configuration.
    ///
    /// The policy file is re-read on every call so edits apply on the next reload.
    pub fn config(&self) -> Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .generation_timeout(Duration::from_secs(self.timeout_secs));

        if let Some(path) = &self.policy_file {
            let policy = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read policy file {}", path.display()))?;
            builder = builder.grounding_policy(policy.trim());
        }

        Ok(builder.build()?)
    }

    /// Build the pipeline used for the next reload.
    pub fn pipeline(&self) -> Result<Arc<RagPipeline>> {
        let config = self.config()?;

        let (embedder, generator): (Arc<dyn EmbeddingProvider>, Arc<dyn Generator>) = if self.offline
        {
            (Arc::new(HashingEmbeddingProvider::default()), Arc::new(ExtractiveGenerator::new()))
        } else {
            (
                Arc::new(
                    OllamaEmbeddingProvider::new(&self.embed_model)
                        .with_base_url(&self.ollama_url)
                        .with_dimensions(self.embed_dimensions),
                ),
                Arc::new(
                    OllamaGenerator::new(&self.model)
                        .with_base_url(&self.ollama_url)
                        .with_timeout(config.generation_timeout),
                ),
            )
        };

        let pipeline = RagPipeline::builder()
            .config(config)
            .embedding_provider(embedder)
            .generator(generator)
            .build()?;
        Ok(Arc::new(pipeline))
    }

    /// A generator for the configured model bounded by `wait`, for connectivity checks.
    pub fn checker(&self, wait: Duration) -> OllamaGenerator {
        OllamaGenerator::new(&self.model).with_base_url(&self.ollama_url).with_timeout(wait)
    }

    /// The document loader for the configured source directory.
    pub fn loader(&self) -> DirectoryLoader {
        DirectoryLoader::new(&self.data_dir).required_exts(&self.extensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["docqa"]).unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config, RagConfig::default());
        assert!(!cli.offline);
        assert!(cli.command.is_none());
    }

    #[test]
    fn invalid_overlap_is_reported_as_config_error() {
        let cli =
            Cli::try_parse_from(["docqa", "--chunk-size", "10", "--chunk-overlap", "10"]).unwrap();
        let err = cli.config().unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn ask_subcommand_and_extensions_parse() {
        let cli = Cli::try_parse_from([
            "docqa",
            "--offline",
            "--ext",
            "md,txt",
            "ask",
            "What is the capital of France?",
        ])
        .unwrap();
        assert_eq!(cli.extensions, vec!["md", "txt"]);
        assert!(matches!(cli.command, Some(Command::Ask { ref question }) if question.starts_with("What")));
        assert!(cli.pipeline().is_ok());
    }

    #[test]
    fn check_subcommand_parses_with_defaults() {
        let cli = Cli::try_parse_from(["docqa", "--model", "llama3:latest", "check"]).unwrap();
        match cli.command {
            Some(Command::Check { prompt, wait_secs }) => {
                assert_eq!(prompt, "What is the capital of France?");
                assert_eq!(wait_secs, 60);
            }
            other => panic!("expected check, got {other:?}"),
        }

        let cli = Cli::try_parse_from(["docqa", "check", "--wait-secs", "5", "--prompt", "ping"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Check { ref prompt, wait_secs: 5 }) if prompt == "ping"
        ));
        assert_eq!(cli.checker(Duration::from_secs(5)).timeout(), Duration::from_secs(5));
    }

    #[test]
    fn policy_file_replaces_default_policy() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("policy.txt");
        std::fs::write(&path, "Answer only from context.\n").unwrap();

        let cli = Cli::try_parse_from(["docqa", "--policy-file", path.to_str().unwrap()]).unwrap();
        assert_eq!(cli.config().unwrap().grounding_policy, "Answer only from context.");
    }
}
