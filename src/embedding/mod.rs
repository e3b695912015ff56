use crate::config::Config;
use crate::http::{build_client, failure_parts, format_endpoint, normalize_base_url};
use crate::processing::sanitize::clean_text;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Input text was empty after whitespace normalization; no request was sent.
    #[error("Input text must be a non-empty string")]
    InvalidInput,
    /// Client could not be constructed from the supplied settings.
    #[error("Embedding client misconfigured: {0}")]
    Misconfigured(String),
    /// HTTP layer failed before receiving a response (includes timeouts).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider rejected the request (auth, quota, server failure).
    #[error("Unexpected embedding response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Provider answered without any embedding data.
    #[error("No embeddings received")]
    EmptyResponse,
    /// Provider returned a vector of the wrong length for the index.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the index.
        expected: usize,
        /// Dimension produced by the provider.
        actual: usize,
    },
}

impl EmbeddingClientError {
    /// Whether a later attempt with the same input could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::InvalidInput | Self::Misconfigured(_) | Self::DimensionMismatch { .. }
        )
    }
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce one embedding vector for the supplied text.
    ///
    /// Implementations never retry; retrying is the caller's policy.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// Embedding client backed by the OpenAI embeddings endpoint.
pub struct OpenAiEmbeddingClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbeddingClient {
    /// Validate credentials and build the HTTP client.
    pub fn authorize(config: &Config) -> Result<Self, EmbeddingClientError> {
        if config.openai_api_key.trim().is_empty() {
            tracing::error!("OpenAI API key not configured");
            return Err(EmbeddingClientError::Misconfigured(
                "OpenAI API key is not set".into(),
            ));
        }

        let base_url = normalize_base_url(&config.openai_base_url)
            .map_err(EmbeddingClientError::Misconfigured)?;
        let http = build_client("embeddings", config.embedding_timeout)?;
        tracing::debug!(
            base_url = %base_url,
            model = %config.embedding_model,
            dimension = config.embedding_dimension,
            timeout_secs = config.embedding_timeout.as_secs(),
            "Initialized embedding client"
        );

        Ok(Self {
            http,
            base_url,
            api_key: config.openai_api_key.clone(),
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
        })
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let input = clean_text(text);
        if input.is_empty() {
            return Err(EmbeddingClientError::InvalidInput);
        }

        tracing::debug!(model = %self.model, chars = input.len(), "Requesting embedding");
        let response = self
            .http
            .post(format_endpoint(&self.base_url, "embeddings"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "input": input,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            return Err(EmbeddingClientError::UnexpectedStatus { status, body });
        }

        let payload: EmbeddingResponse = response.json().await?;
        let vector = payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or(EmbeddingClientError::EmptyResponse)?;

        if vector.len() != self.dimension {
            return Err(EmbeddingClientError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }
}
