//! Embedding and generation adapters for a local Ollama daemon.
//!
//! Both adapters talk to Ollama's native HTTP API with `reqwest`:
//! [`OllamaEmbeddingProvider`] calls `/api/embed` and [`OllamaGenerator`]
//! calls `/api/chat` with streaming disabled. Every request is bounded by a
//! timeout; generation timeouts default to five minutes because local
//! CPU-bound inference is slow.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::DEFAULT_GENERATION_TIMEOUT;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::prompt::GenerationRequest;

/// The default Ollama daemon URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// The default generation model.
pub const DEFAULT_CHAT_MODEL: &str = "llama3:latest";

/// The default embedding model (the Ollama build of all-MiniLM-L6-v2).
pub const DEFAULT_EMBED_MODEL: &str = "all-minilm";

/// The dimensionality of [`DEFAULT_EMBED_MODEL`].
pub const DEFAULT_EMBED_DIMENSIONS: usize = 384;

const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(120);

/// Resolve the daemon URL from `OLLAMA_HOST`, falling back to [`DEFAULT_OLLAMA_URL`].
///
/// `OLLAMA_HOST` is often set without a scheme (`127.0.0.1:11434`); `http://`
/// is assumed in that case.
pub fn base_url_from_env() -> String {
    std::env::var("OLLAMA_HOST")
        .ok()
        .filter(|host| !host.trim().is_empty())
        .map(|host| normalize_base_url(&host))
        .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string())
}

fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Outcome of a bounded request, before mapping into a caller-specific error.
enum CallError {
    Timeout,
    Connect(reqwest::Error),
    Other(String),
}

/// Run `request` under `timeout`, classifying transport failures.
async fn bounded<T, F>(timeout: Duration, request: F) -> std::result::Result<T, CallError>
where
    F: Future<Output = std::result::Result<T, CallError>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(CallError::Timeout),
    }
}

fn classify(e: reqwest::Error) -> CallError {
    if e.is_timeout() {
        CallError::Timeout
    } else if e.is_connect() {
        CallError::Connect(e)
    } else {
        CallError::Other(e.to_string())
    }
}

/// POST `body` as JSON and decode a JSON response, reporting non-2xx bodies.
async fn post_json<B, R>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
) -> std::result::Result<R, CallError>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let response = client.post(url).json(body).send().await.map_err(classify)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let detail =
            serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error).unwrap_or(body);
        return Err(CallError::Other(format!("API returned {status}: {detail}")));
    }

    response.json::<R>().await.map_err(|e| {
        if e.is_timeout() {
            CallError::Timeout
        } else {
            CallError::Other(format!("failed to parse response: {e}"))
        }
    })
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by Ollama's `/api/embed` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("all-minilm")
///     .with_base_url("http://localhost:11434");
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `model` against the daemon named by [`base_url_from_env`].
    ///
    /// Dimensions default to [`DEFAULT_EMBED_DIMENSIONS`]; use
    /// [`with_dimensions`](Self::with_dimensions) for other models.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url_from_env(),
            model: model.into(),
            dimensions: DEFAULT_EMBED_DIMENSIONS,
            timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    /// Set the daemon URL.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    /// Set the declared output dimensionality of the model.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Set the bound on a single embedding request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn error(&self, message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: format!("Ollama/{}", self.model), message: message.into() }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| self.error("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "Ollama", batch_size = texts.len(), model = %self.model, "embedding batch");

        let url = format!("{}/api/embed", self.base_url);
        let body = EmbedRequest { model: &self.model, input: texts };
        let response: EmbedResponse =
            bounded(self.timeout, post_json(&self.client, &url, &body)).await.map_err(|e| {
                let message = match e {
                    CallError::Timeout => format!("request timed out after {}s", self.timeout.as_secs()),
                    CallError::Connect(e) => format!("cannot reach {url}: {e}"),
                    CallError::Other(message) => message,
                };
                error!(provider = "Ollama", error = %message, "embedding request failed");
                self.error(message)
            })?;

        if response.embeddings.len() != texts.len() {
            return Err(self.error(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Generation ─────────────────────────────────────────────────────

/// A [`Generator`] backed by Ollama's `/api/chat` endpoint.
///
/// The grounding policy is sent as the system message and the rendered
/// context-plus-question prompt as the user message.
///
/// # Example
///
/// ```rust,ignore
/// use std::time::Duration;
/// use docqa_rag::OllamaGenerator;
///
/// let generator = OllamaGenerator::new("llama3:latest")
///     .with_timeout(Duration::from_secs(300));
/// ```
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    name: String,
    timeout: Duration,
    temperature: Option<f32>,
}

impl OllamaGenerator {
    /// Create a generator for `model` against the daemon named by [`base_url_from_env`].
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url_from_env(),
            name: format!("ollama/{model}"),
            model,
            timeout: DEFAULT_GENERATION_TIMEOUT,
            temperature: None,
        }
    }

    /// Set the daemon URL.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = normalize_base_url(base_url.as_ref());
        self
    }

    /// Set the bound on a single generation call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// The configured bound on a single generation call.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let user_prompt = request.user_prompt();
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system_policy },
                ChatMessage { role: "user", content: &user_prompt },
            ],
            stream: false,
            options: self.temperature.map(|temperature| ChatOptions { temperature }),
        };

        debug!(
            provider = "Ollama",
            model = %self.model,
            prompt_len = user_prompt.len(),
            timeout_secs = self.timeout.as_secs(),
            "generating answer"
        );

        let response: ChatResponse =
            bounded(self.timeout, post_json(&self.client, &url, &body)).await.map_err(|e| {
                let err = match e {
                    CallError::Timeout => RagError::GenerationTimeout { timeout: self.timeout },
                    CallError::Connect(e) => RagError::GenerationUnavailable {
                        endpoint: url.clone(),
                        message: e.to_string(),
                    },
                    CallError::Other(message) => {
                        RagError::Generation { provider: self.name.clone(), message }
                    }
                };
                error!(provider = "Ollama", error = %err, "generation failed");
                err
            })?;

        Ok(response.message.content.trim().to_string())
    }
}
