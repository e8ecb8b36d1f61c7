//! Directory loader turning files into [`Document`]s.
//!
//! Every regular file beneath the source directory is read as UTF-8 text.
//! Hidden files and directories are ignored. Files that cannot be read or
//! are not valid UTF-8 are skipped and counted in the [`LoadReport`].

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::document::Document;
use crate::error::{RagError, Result};

/// The outcome of a directory load.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successfully loaded documents, sorted by path.
    pub documents: Vec<Document>,
    /// Number of files skipped because they could not be read as text.
    pub skipped: usize,
}

impl LoadReport {
    /// Number of successfully loaded documents.
    pub fn loaded(&self) -> usize {
        self.documents.len()
    }
}

/// Loads every text file beneath a directory.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::DirectoryLoader;
///
/// let report = DirectoryLoader::new("data").required_exts(["md", "txt"]).load()?;
/// println!("loaded {} docs", report.loaded());
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
    required_exts: Option<Vec<String>>,
    num_files_limit: Option<usize>,
}

impl DirectoryLoader {
    /// Create a loader for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), required_exts: None, num_files_limit: None }
    }

    /// Only load files whose extension is in `exts` (case-insensitive, without the dot).
    pub fn required_exts<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let exts: Vec<String> = exts
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self.required_exts = if exts.is_empty() { None } else { Some(exts) };
        self
    }

    /// Stop after `limit` candidate files (in sorted path order).
    pub fn num_files_limit(mut self, limit: usize) -> Self {
        self.num_files_limit = Some(limit);
        self
    }

    /// The source directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Enumerate candidate files in sorted order.
    fn discover(&self) -> Vec<PathBuf> {
        let mut files = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(DirEntry::into_path)
            .filter(|path| self.extension_allowed(path))
            .collect::<Vec<_>>();

        files.sort();
        if let Some(limit) = self.num_files_limit {
            files.truncate(limit);
        }
        files
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        let Some(required) = &self.required_exts else {
            return true;
        };
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| required.iter().any(|r| r.eq_ignore_ascii_case(ext)))
    }

    /// Read every candidate file into a [`Document`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LoadError`] if the root is missing or not a
    /// directory, or if no document could be loaded from it.
    pub fn load(&self) -> Result<LoadReport> {
        if !self.root.is_dir() {
            return Err(RagError::LoadError {
                path: self.root.clone(),
                message: "source directory does not exist or is not a directory".to_string(),
            });
        }

        let mut report = LoadReport::default();
        for path in self.discover() {
            match fs::read_to_string(&path) {
                Ok(text) => report.documents.push(self.document(&path, text)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                    report.skipped += 1;
                }
            }
        }

        if report.documents.is_empty() {
            return Err(RagError::LoadError {
                path: self.root.clone(),
                message: format!("no readable documents found ({} skipped)", report.skipped),
            });
        }

        info!(
            root = %self.root.display(),
            loaded = report.loaded(),
            skipped = report.skipped,
            "loaded documents"
        );
        Ok(report)
    }

    fn document(&self, path: &Path, text: String) -> Document {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let id = relative.to_string_lossy().replace('\\', "/");

        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let content_hash = format!("{:x}", hasher.finalize());

        let mut metadata = HashMap::new();
        metadata.insert("file_path".to_string(), path.display().to_string());
        if let Some(name) = path.file_name() {
            metadata.insert("file_name".to_string(), name.to_string_lossy().into_owned());
        }
        if let Some(ext) = path.extension() {
            metadata.insert("file_type".to_string(), ext.to_string_lossy().to_ascii_lowercase());
        }
        metadata.insert("file_size".to_string(), text.len().to_string());
        metadata.insert("content_hash".to_string(), content_hash);

        Document { id, text, metadata, source_uri: Some(path.display().to_string()) }
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}
