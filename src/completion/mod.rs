//! Chat completion grounded on a stored record.
//!
//! This path is not part of scheduled ingestion; it answers a question using one record from
//! the startup cache as assistant context, the same way the embedding adapter talks to the
//! OpenAI API directly over HTTP.

use crate::config::Config;
use crate::http::{build_client, failure_parts, format_endpoint, normalize_base_url};
use crate::pinecone::IndexMatch;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Prompt used when the caller does not supply one.
pub const DEFAULT_PROMPT: &str = "You are given context extracted from ingested documents. \
Answer using only that context and say so when it does not contain the answer.";

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum CompletionClientError {
    /// Prompt or question was empty; no request was sent.
    #[error("Input prompt must be a non-empty string")]
    InvalidInput,
    /// Client could not be constructed from the supplied settings.
    #[error("Completion client misconfigured: {0}")]
    Misconfigured(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider returned an error response.
    #[error("Unexpected completion response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Request passed to the completion provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Instructions sent as the first user message.
    pub prompt: String,
    /// Question sent after the context.
    pub ask: String,
    /// Record whose vector is sent as assistant context.
    pub context: IndexMatch,
}

/// Interface implemented by chat completion providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Return the model's answer, or `None` when the model produced nothing usable.
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<Option<String>, CompletionClientError>;
}

/// Completion client backed by the OpenAI chat completions endpoint.
pub struct OpenAiCompletionClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiCompletionClient {
    /// Validate credentials and build the HTTP client.
    pub fn authorize(config: &Config) -> Result<Self, CompletionClientError> {
        if config.openai_api_key.trim().is_empty() {
            return Err(CompletionClientError::Misconfigured(
                "OpenAI API key is not set".into(),
            ));
        }
        let base_url = normalize_base_url(&config.openai_base_url)
            .map_err(CompletionClientError::Misconfigured)?;
        let http = build_client("completion", config.embedding_timeout)?;

        Ok(Self {
            http,
            base_url,
            api_key: config.openai_api_key.clone(),
            model: config.completion_model.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn context_content(context: &IndexMatch) -> String {
    context
        .values
        .iter()
        .map(f32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<Option<String>, CompletionClientError> {
        if request.prompt.trim().is_empty() || request.ask.trim().is_empty() {
            return Err(CompletionClientError::InvalidInput);
        }

        let payload = json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": request.prompt },
                { "role": "assistant", "content": context_content(&request.context) },
                { "role": "user", "content": request.ask },
            ],
            "temperature": 1,
        });

        let response = self
            .http
            .post(format_endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            let error = CompletionClientError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Error while fetching completion");
            return Err(error);
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() || content.to_lowercase().contains("error") {
            tracing::warn!(content = %content, "Completion returned no usable answer");
            return Ok(None);
        }

        Ok(Some(content))
    }
}
