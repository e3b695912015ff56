//! Ingestion service shared by the scheduler and the admin HTTP surface.

use crate::{
    completion::{CompletionClient, CompletionRequest, DEFAULT_PROMPT},
    metrics::MetricsSnapshot,
    pinecone::IndexMatch,
    processing::{
        cache::RecordCache,
        orchestrator::IngestionOrchestrator,
        types::{AskError, RunError, RunReport},
    },
};
use async_trait::async_trait;
use std::sync::Arc;

/// Couples the orchestrator with the startup record cache and the completion client.
///
/// Construct once near process start and share through an `Arc`; the scheduler holds the same
/// orchestrator, so manual and scheduled runs contend for one single-flight guard.
pub struct IngestionService {
    orchestrator: Arc<IngestionOrchestrator>,
    cache: Arc<RecordCache>,
    completion: Arc<dyn CompletionClient>,
}

/// Abstraction over the ingestion service used by external surfaces.
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Run one ingestion now.
    async fn trigger_run(&self) -> Result<RunReport, RunError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Records loaded into the startup cache.
    async fn cached_records(&self) -> Vec<IndexMatch>;

    /// Answer `question` using the first cached record as context.
    async fn ask(&self, question: String, prompt: Option<String>)
    -> Result<Option<String>, AskError>;
}

impl IngestionService {
    /// Build a service over already-authorized collaborators.
    pub fn new(
        orchestrator: Arc<IngestionOrchestrator>,
        cache: Arc<RecordCache>,
        completion: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            completion,
        }
    }

    /// Orchestrator driving the runs, shared with the scheduler.
    pub fn orchestrator(&self) -> Arc<IngestionOrchestrator> {
        Arc::clone(&self.orchestrator)
    }
}

#[async_trait]
impl IngestionApi for IngestionService {
    async fn trigger_run(&self) -> Result<RunReport, RunError> {
        tracing::info!("Manual ingestion run requested");
        self.orchestrator.run().await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.orchestrator.metrics_snapshot()
    }

    async fn cached_records(&self) -> Vec<IndexMatch> {
        self.cache.records().await
    }

    async fn ask(
        &self,
        question: String,
        prompt: Option<String>,
    ) -> Result<Option<String>, AskError> {
        let Some(context) = self.cache.first().await else {
            tracing::warn!("Question received but the record cache is empty");
            return Err(AskError::NoContext);
        };
        tracing::debug!(record_id = %context.id, "Answering question from cached record");

        let request = CompletionRequest {
            prompt: prompt
                .filter(|prompt| !prompt.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            ask: question,
            context,
        };
        Ok(self.completion.create_completion(request).await?)
    }
}
