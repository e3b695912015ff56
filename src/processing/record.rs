//! Index record construction.

use crate::processing::sanitize::{SNIPPET_CHARS, snippet};
use serde::Serialize;
use uuid::Uuid;

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    /// Name of the source document.
    pub filename: String,
    /// Leading characters of the extracted text.
    pub text_snippet: String,
}

/// Unit written to the vector index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Record identifier. Random, so re-ingesting a document adds a new record.
    pub id: String,
    /// Embedding vector.
    pub values: Vec<f32>,
    /// Source metadata.
    pub metadata: RecordMetadata,
}

impl Record {
    /// Build a record for an embedded document with a freshly generated id.
    pub fn build(filename: &str, source_text: &str, values: Vec<f32>) -> Self {
        Self {
            id: generate_record_id(),
            values,
            metadata: RecordMetadata {
                filename: filename.to_string(),
                text_snippet: snippet(source_text, SNIPPET_CHARS),
            },
        }
    }
}

/// Generate a random record identifier.
pub fn generate_record_id() -> String {
    Uuid::new_v4().to_string()
}
