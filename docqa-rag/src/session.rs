//! Session context: active index handle, lifecycle state, and conversation history.
//!
//! A [`Session`] is the only holder of mutable state. Queries take a cheap
//! `Arc` snapshot of the active index when they start, and a reload
//! publishes its result with a single handle swap, so a running query is
//! never affected by a concurrent build. Only one build runs at a time;
//! overlapping reload requests are rejected with
//! [`RagError::BuildInProgress`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::loader::DirectoryLoader;
use crate::pipeline::{Answer, BuildReport, RagPipeline};

/// Counts describing a successful reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadReport {
    /// Number of documents loaded.
    pub loaded: usize,
    /// Number of files skipped by the loader.
    pub skipped: usize,
    /// Number of chunks in the new index.
    pub chunk_count: usize,
}

/// Lifecycle state of the session's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexState {
    /// No build has succeeded yet.
    Empty,
    /// A build is running.
    Building,
    /// An index is available for queries.
    Ready,
}

impl fmt::Display for IndexState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexState::Empty => write!(f, "empty"),
            IndexState::Building => write!(f, "building"),
            IndexState::Ready => write!(f, "ready"),
        }
    }
}

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking questions.
    User,
    /// The answering pipeline.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who produced the turn.
    pub role: Role,
    /// The question, answer, or failure notice.
    pub text: String,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
    /// Whether this assistant turn records a failure instead of an answer.
    #[serde(default)]
    pub failed: bool,
}

impl ConversationTurn {
    fn new(role: Role, text: impl Into<String>, failed: bool) -> Self {
        Self { role, text: text.into(), timestamp: Utc::now(), failed }
    }
}

/// Marks a build as running until dropped, including when the reload future is cancelled.
struct BuildGuard<'a>(&'a AtomicBool);

impl<'a> BuildGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).ok()?;
        Some(Self(flag))
    }
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An index together with the pipeline that built it.
///
/// Questions are always answered by the same pipeline that built the
/// index, so the question embedder matches the stored vectors.
#[derive(Debug)]
pub struct ActiveIndex {
    /// The immutable index.
    pub index: VectorIndex,
    /// The pipeline used to build it.
    pub pipeline: Arc<RagPipeline>,
}

/// State held across repeated interactions with one document source.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{DirectoryLoader, Session};
///
/// let session = Session::new(DirectoryLoader::new("data"));
/// session.reload(Arc::new(pipeline)).await?;
/// let answer = session.ask("What is the capital of France?").await?;
/// ```
#[derive(Debug)]
pub struct Session {
    loader: DirectoryLoader,
    active: RwLock<Option<Arc<ActiveIndex>>>,
    building: AtomicBool,
    history: Mutex<Vec<ConversationTurn>>,
}

impl Session {
    /// Start a session over the documents `loader` reads.
    pub fn new(loader: DirectoryLoader) -> Self {
        Self {
            loader,
            active: RwLock::new(None),
            building: AtomicBool::new(false),
            history: Mutex::new(Vec::new()),
        }
    }

    /// The document source this session reloads from.
    pub fn loader(&self) -> &DirectoryLoader {
        &self.loader
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> IndexState {
        if self.building.load(Ordering::Acquire) {
            return IndexState::Building;
        }
        if self.active.read().await.is_some() { IndexState::Ready } else { IndexState::Empty }
    }

    /// The index queries would currently use, if any.
    pub async fn snapshot(&self) -> Option<Arc<ActiveIndex>> {
        self.active.read().await.clone()
    }

    /// Rebuild the index from the document source with `pipeline`.
    ///
    /// The new index replaces the old one only if every step succeeds. On
    /// failure, or if this future is dropped before completion, the previous
    /// index (or none) stays authoritative.
    ///
    /// # Errors
    ///
    /// - [`RagError::BuildInProgress`] if another reload is running
    /// - [`RagError::LoadError`], [`RagError::EmbeddingError`], or any other
    ///   build-phase error
    pub async fn reload(&self, pipeline: Arc<RagPipeline>) -> Result<ReloadReport> {
        let _building = BuildGuard::acquire(&self.building).ok_or_else(|| {
            warn!("reload rejected: build already in progress");
            RagError::BuildInProgress
        })?;

        info!(root = %self.loader.root().display(), "reloading index");
        let BuildReport { index, loaded, skipped } =
            pipeline.load_and_build(&self.loader).await.map_err(|e| {
                warn!(error = %e, "reload failed; keeping previous index");
                e
            })?;

        let report = ReloadReport { loaded, skipped, chunk_count: index.len() };
        *self.active.write().await = Some(Arc::new(ActiveIndex { index, pipeline }));

        info!(loaded, skipped, chunk_count = report.chunk_count, "index ready");
        Ok(report)
    }

    /// Answer `question` against the current index and record the exchange.
    ///
    /// The question is always appended to the history. A successful answer
    /// is appended as an assistant turn; a failure after the index was found
    /// is appended as an assistant turn holding the failure notice.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexNotReady`] if no build has succeeded yet
    /// - retrieval and generation errors from [`RagPipeline::answer`]
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.push(ConversationTurn::new(Role::User, question, false)).await;

        let Some(active) = self.snapshot().await else {
            return Err(RagError::IndexNotReady);
        };

        match active.pipeline.answer(Some(&active.index), question).await {
            Ok(answer) => {
                self.push(ConversationTurn::new(Role::Assistant, answer.text.clone(), false)).await;
                Ok(answer)
            }
            Err(e) => {
                self.push(ConversationTurn::new(Role::Assistant, e.to_string(), true)).await;
                Err(e)
            }
        }
    }

    /// A copy of the conversation so far, oldest first.
    pub async fn history(&self) -> Vec<ConversationTurn> {
        self.history.lock().await.clone()
    }

    async fn push(&self, turn: ConversationTurn) {
        self.history.lock().await.push(turn);
    }
}
