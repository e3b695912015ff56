//! Core data types and error definitions for the ingestion pipeline.

use crate::completion::CompletionClientError;
use crate::documents::ExtractionError;
use crate::embedding::EmbeddingClientError;
use crate::pinecone::PineconeError;
use serde::Serialize;
use thiserror::Error;

/// Reason a single document was dropped from a run.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Text extraction produced nothing usable.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractionError),
    /// Embedding generation failed on every attempt.
    #[error("Failed to generate embeddings after {attempts} attempt(s): {source}")]
    Embedding {
        /// Attempts made before giving up.
        attempts: usize,
        /// Error returned by the final attempt.
        #[source]
        source: EmbeddingClientError,
    },
    /// The vector index rejected the record.
    #[error("Failed to upsert record: {0}")]
    Store(#[from] PineconeError),
}

impl DocumentError {
    /// Short stage label used in reports.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Extraction(_) => "extraction",
            Self::Embedding { .. } => "embedding",
            Self::Store(_) => "store",
        }
    }
}

/// Errors preventing a run from starting.
#[derive(Debug, Error)]
pub enum RunError {
    /// Another run holds the single-flight guard.
    #[error("An ingestion run is already in progress")]
    AlreadyRunning,
}

/// Errors surfaced while answering a question against the record cache.
#[derive(Debug, Error)]
pub enum AskError {
    /// The cache holds no record to use as context.
    #[error("No cached records available as context")]
    NoContext,
    /// The completion provider failed.
    #[error(transparent)]
    Completion(#[from] CompletionClientError),
}

/// Document dropped from a run, with the stage that failed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedDocument {
    /// Name of the skipped document.
    pub name: String,
    /// Pipeline stage that failed.
    pub stage: &'static str,
    /// Human-readable failure.
    pub reason: String,
}

/// Summary of one completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Documents returned by the source.
    pub documents_listed: usize,
    /// Ids of the records upserted, in processing order.
    pub records_upserted: Vec<String>,
    /// Documents skipped, in processing order.
    pub skipped: Vec<SkippedDocument>,
}

impl RunReport {
    pub(crate) fn record_skip(&mut self, name: &str, error: &DocumentError) {
        self.skipped.push(SkippedDocument {
            name: name.to_string(),
            stage: error.stage(),
            reason: error.to_string(),
        });
    }
}
