//! Pinecone vector index integration.

use crate::processing::Record;
use async_trait::async_trait;

pub mod client;
pub mod types;

pub use client::PineconeService;
pub use types::{IndexMatch, PineconeError, QueryRequest};

/// Interface implemented by vector index backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite one record, keyed by its id.
    async fn upsert(&self, record: &Record) -> Result<(), PineconeError>;

    /// Return up to `top_k` nearest matches for the request vector.
    async fn query(&self, request: &QueryRequest) -> Result<Vec<IndexMatch>, PineconeError>;
}
