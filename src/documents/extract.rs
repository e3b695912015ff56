//! Raw bytes to plain text.

use async_trait::async_trait;
use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Reasons a document produced no usable text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The document parsed but contained no text.
    #[error("document contains no extractable text")]
    Empty,
    /// The document claims a known format but could not be parsed.
    #[error("document could not be parsed: {0}")]
    Malformed(String),
    /// The document is neither a PDF nor UTF-8 text.
    #[error("unsupported document format")]
    Unsupported,
}

/// Interface implemented by text extractors.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Convert raw document bytes into plain text.
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Extracts PDFs through `pdf-extract` and passes UTF-8 text documents through.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocumentExtractor;

impl DocumentExtractor {
    /// Construct a new extractor.
    pub const fn new() -> Self {
        Self
    }

    /// Check whether the bytes start with the PDF header.
    pub fn is_pdf(bytes: &[u8]) -> bool {
        bytes.starts_with(PDF_MAGIC)
    }
}

#[async_trait]
impl TextExtractor for DocumentExtractor {
    async fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = if Self::is_pdf(bytes) {
            let owned = bytes.to_vec();
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
                .await
                .map_err(|error| ExtractionError::Malformed(format!("task join error: {error}")))?
                .map_err(|error| {
                    tracing::error!(error = %error, "PDF parsing failed");
                    ExtractionError::Malformed(error.to_string())
                })?
        } else {
            std::str::from_utf8(bytes)
                .map_err(|_| ExtractionError::Unsupported)?
                .to_string()
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(text)
    }
}
