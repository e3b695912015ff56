//! HTTP client wrapper for interacting with Pinecone.

use crate::config::Config;
use crate::http::{build_client, failure_parts, format_endpoint, normalize_base_url};
use crate::pinecone::VectorIndex;
use crate::pinecone::types::{
    DescribeIndexResponse, IndexMatch, PineconeError, QueryRequest, QueryResponse, UpsertResponse,
};
use crate::processing::Record;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::json;

const API_VERSION: &str = "2024-07";

/// Lightweight HTTP client for a single Pinecone index.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) host: String,
    pub(crate) api_key: String,
}

impl PineconeService {
    /// Build the client and resolve the index data-plane host.
    ///
    /// When `PINECONE_INDEX_HOST` is configured the control plane is not contacted.
    pub async fn authorize(config: &Config) -> Result<Self, PineconeError> {
        if config.pinecone_api_key.trim().is_empty() {
            return Err(PineconeError::MissingApiKey);
        }

        let client = build_client("pinecone", config.index_timeout)?;
        let host = match &config.pinecone_index_host {
            Some(host) => host.clone(),
            None => {
                describe_index_host(
                    &client,
                    &config.pinecone_controller_url,
                    &config.pinecone_api_key,
                    &config.pinecone_index_name,
                )
                .await?
            }
        };
        let host = normalize_base_url(&with_scheme(&host)).map_err(PineconeError::InvalidUrl)?;

        tracing::debug!(
            index = %config.pinecone_index_name,
            host = %host,
            timeout_secs = config.index_timeout.as_secs(),
            "Initialized Pinecone HTTP client"
        );

        Ok(Self {
            client,
            host,
            api_key: config.pinecone_api_key.clone(),
        })
    }

    /// Upsert a single record into the index.
    pub async fn upsert_record(&self, record: &Record) -> Result<(), PineconeError> {
        let response = self
            .request(Method::POST, "vectors/upsert")
            .json(&json!({ "vectors": [record] }))
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(record_id = %record.id, error = %error, "Pinecone upsert failed");
            return Err(error);
        }

        let upserted = response
            .json::<UpsertResponse>()
            .await
            .ok()
            .and_then(|payload| payload.upserted_count);
        tracing::debug!(record_id = %record.id, upserted = ?upserted, "Record upserted");
        Ok(())
    }

    /// Run a nearest-neighbor query, returning at most `top_k` matches.
    pub async fn query_matches(
        &self,
        request: &QueryRequest,
    ) -> Result<Vec<IndexMatch>, PineconeError> {
        let response = self
            .request(Method::POST, "query")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = failure_parts(response).await;
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(top_k = request.top_k, error = %error, "Pinecone query failed");
            return Err(error);
        }

        let QueryResponse { mut matches } = response.json().await?;
        matches.truncate(request.top_k);
        tracing::debug!(matches = matches.len(), "Pinecone query completed");
        Ok(matches)
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format_endpoint(&self.host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

#[async_trait]
impl VectorIndex for PineconeService {
    async fn upsert(&self, record: &Record) -> Result<(), PineconeError> {
        self.upsert_record(record).await
    }

    async fn query(&self, request: &QueryRequest) -> Result<Vec<IndexMatch>, PineconeError> {
        self.query_matches(request).await
    }
}

async fn describe_index_host(
    client: &Client,
    controller_url: &str,
    api_key: &str,
    index_name: &str,
) -> Result<String, PineconeError> {
    let controller = normalize_base_url(controller_url).map_err(PineconeError::InvalidUrl)?;
    let response = client
        .get(format_endpoint(&controller, &format!("indexes/{index_name}")))
        .header("Api-Key", api_key)
        .header("X-Pinecone-API-Version", API_VERSION)
        .send()
        .await?;

    if !response.status().is_success() {
        let (status, body) = failure_parts(response).await;
        let error = PineconeError::UnexpectedStatus { status, body };
        tracing::error!(index = index_name, error = %error, "Describe index failed");
        return Err(error);
    }

    let DescribeIndexResponse { host } = response.json().await?;
    host.filter(|host| !host.trim().is_empty())
        .ok_or_else(|| PineconeError::MissingHost(index_name.to_string()))
}

fn with_scheme(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}
