//! Document discovery and text extraction.

pub mod extract;
pub mod source;

pub use extract::{DocumentExtractor, ExtractionError, TextExtractor};
pub use source::{Document, DocumentSource, DocumentSourceError, FsDocumentSource};
