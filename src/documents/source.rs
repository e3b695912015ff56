//! Filesystem-backed document listing.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Raw document awaiting extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name the document was read from.
    pub name: String,
    /// Unparsed file contents.
    pub bytes: Vec<u8>,
}

impl Document {
    /// Convenience constructor.
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Errors surfaced by document sources.
#[derive(Debug, Error)]
pub enum DocumentSourceError {
    /// The document directory exists but cannot be read.
    #[error("Document directory {path} is unavailable: {reason}")]
    SourceUnavailable {
        /// Directory that was being listed.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },
}

/// Interface implemented by document providers.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Return the current document set. An empty or missing location yields no documents.
    async fn list_documents(&self) -> Result<Vec<Document>, DocumentSourceError>;
}

/// Lists the regular files directly inside a directory, ordered by file name.
pub struct FsDocumentSource {
    root: PathBuf,
}

impl FsDocumentSource {
    /// Build a source over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory scanned by this source.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DocumentSource for FsDocumentSource {
    async fn list_documents(&self) -> Result<Vec<Document>, DocumentSourceError> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || read_directory(&root))
            .await
            .map_err(|error| DocumentSourceError::SourceUnavailable {
                path: self.root.clone(),
                reason: format!("listing task failed: {error}"),
            })?
    }
}

fn read_directory(root: &Path) -> Result<Vec<Document>, DocumentSourceError> {
    match std::fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(DocumentSourceError::SourceUnavailable {
                path: root.to_path_buf(),
                reason: "not a directory".into(),
            });
        }
        Err(error) if error.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %root.display(), "Document directory missing; nothing to ingest");
            return Ok(Vec::new());
        }
        Err(error) => {
            return Err(DocumentSourceError::SourceUnavailable {
                path: root.to_path_buf(),
                reason: error.to_string(),
            });
        }
    }

    let mut documents = Vec::new();
    let entries = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) if error.depth() == 0 => {
                return Err(DocumentSourceError::SourceUnavailable {
                    path: root.to_path_buf(),
                    reason: error.to_string(),
                });
            }
            Err(error) => {
                tracing::warn!(error = %error, "Skipping unreadable directory entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            tracing::debug!(path = %entry.path().display(), "Skipping non-file entry");
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        match std::fs::read(entry.path()) {
            Ok(bytes) => documents.push(Document { name, bytes }),
            Err(error) => {
                tracing::warn!(file = %name, error = %error, "Skipping unreadable document");
            }
        }
    }

    tracing::debug!(path = %root.display(), count = documents.len(), "Read documents");
    Ok(documents)
}
