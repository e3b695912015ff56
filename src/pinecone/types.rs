//! Shared types used by the Pinecone client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Pinecone.
#[derive(Debug, Error)]
pub enum PineconeError {
    /// A configured URL failed to parse or normalize.
    #[error("Invalid Pinecone URL: {0}")]
    InvalidUrl(String),
    /// The API key was empty at authorization time.
    #[error("Pinecone API key is not set")]
    MissingApiKey,
    /// The index description did not carry a data-plane host.
    #[error("Pinecone index '{0}' has no host")]
    MissingHost(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Pinecone responded with an unexpected status code.
    #[error("Unexpected Pinecone response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Pinecone.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Similarity query against the index.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Query vector; must match the index dimension.
    pub vector: Vec<f32>,
    /// Maximum number of matches to return.
    pub top_k: usize,
    /// Whether match metadata is returned.
    pub include_metadata: bool,
    /// Whether match vectors are returned.
    pub include_values: bool,
}

/// Nearest-neighbor match returned by a query.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexMatch {
    /// Record identifier.
    pub id: String,
    /// Similarity score computed by Pinecone.
    #[serde(default)]
    pub score: f32,
    /// Stored vector, present when `includeValues` was requested.
    #[serde(default)]
    pub values: Vec<f32>,
    /// Stored metadata, present when `includeMetadata` was requested.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct DescribeIndexResponse {
    #[serde(default)]
    pub(crate) host: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub(crate) matches: Vec<IndexMatch>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertResponse {
    #[serde(default)]
    pub(crate) upserted_count: Option<u64>,
}
