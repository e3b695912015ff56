//! Ingestion orchestrator: discovery, extraction, embedding with retry, and upsert.

use crate::{
    documents::{Document, DocumentSource, ExtractionError, TextExtractor},
    embedding::{EmbeddingClient, EmbeddingClientError},
    metrics::{IngestMetrics, MetricsSnapshot},
    pinecone::VectorIndex,
    processing::{
        record::Record,
        retry::RetryPolicy,
        sanitize::clean_text,
        types::{DocumentError, RunError, RunReport},
    },
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Drives ingestion runs over a document source.
///
/// Every collaborator is injected at construction and shared across runs. Documents are
/// processed one at a time in listing order, and a failure on one document never stops the
/// others. Only one run executes at a time: overlapping calls to [`run`](Self::run) are
/// rejected with [`RunError::AlreadyRunning`], whoever the caller is.
pub struct IngestionOrchestrator {
    source: Arc<dyn DocumentSource>,
    extractor: Arc<dyn TextExtractor>,
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndex>,
    retry: RetryPolicy,
    metrics: Arc<IngestMetrics>,
    running: AtomicBool,
}

impl IngestionOrchestrator {
    /// Assemble an orchestrator from its collaborators.
    pub fn new(
        source: Arc<dyn DocumentSource>,
        extractor: Arc<dyn TextExtractor>,
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndex>,
        retry: RetryPolicy,
        metrics: Arc<IngestMetrics>,
    ) -> Self {
        Self {
            source,
            extractor,
            embedder,
            index,
            retry,
            metrics,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a run currently holds the single-flight guard.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Execute one ingestion run over the current document set.
    ///
    /// Per-document failures are logged and reported in the returned [`RunReport`]; the only
    /// error is [`RunError::AlreadyRunning`].
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            self.metrics.record_rejected_run();
            tracing::warn!("Ingestion run already in progress; skipping");
            return Err(RunError::AlreadyRunning);
        };

        let started = Instant::now();
        tracing::info!("Ingestion run started");

        let documents = match self.source.list_documents().await {
            Ok(documents) => documents,
            Err(error) => {
                tracing::error!(error = %error, "Document source unavailable; treating as empty");
                Vec::new()
            }
        };

        let mut report = RunReport {
            documents_listed: documents.len(),
            ..RunReport::default()
        };

        for document in &documents {
            match self.process_document(document).await {
                Ok(record_id) => {
                    self.metrics.record_upsert();
                    report.records_upserted.push(record_id);
                }
                Err(error) => {
                    self.metrics.record_skip();
                    match &error {
                        DocumentError::Extraction(_) => {
                            tracing::warn!(document = %document.name, error = %error, "Skipping document");
                        }
                        DocumentError::Embedding { attempts, .. } => {
                            tracing::error!(
                                document = %document.name,
                                attempts,
                                error = %error,
                                "Failed to generate embeddings after multiple attempts; skipping document"
                            );
                        }
                        DocumentError::Store(_) => {
                            tracing::error!(document = %document.name, error = %error, "Failed to store record; skipping document");
                        }
                    }
                    report.record_skip(&document.name, &error);
                }
            }
        }

        self.metrics.record_run_completed();
        tracing::info!(
            listed = report.documents_listed,
            upserted = report.records_upserted.len(),
            skipped = report.skipped.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Processing complete"
        );
        Ok(report)
    }

    async fn process_document(&self, document: &Document) -> Result<String, DocumentError> {
        let text = self.extractor.extract(&document.bytes).await?;
        tracing::info!(
            document = %document.name,
            length = text.chars().count(),
            "Extracted text"
        );

        let cleaned = clean_text(&text);
        if cleaned.is_empty() {
            return Err(ExtractionError::Empty.into());
        }

        let vector = self
            .retry
            .execute(
                || self.embedder.embed(&cleaned),
                EmbeddingClientError::is_retryable,
            )
            .await
            .map_err(|exhausted| DocumentError::Embedding {
                attempts: exhausted.attempts,
                source: exhausted.last_error,
            })?;

        let record = Record::build(&document.name, &text, vector);
        tracing::info!(document = %document.name, record_id = %record.id, "Adding record");
        self.index.upsert(&record).await?;
        Ok(record.id)
    }
}

/// Holds the run-in-progress flag; clears it on drop, including during unwinding.
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{DocumentExtractor, DocumentSourceError};
    use crate::pinecone::{IndexMatch, PineconeError, QueryRequest};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct StaticSource(Vec<Document>);

    #[async_trait]
    impl DocumentSource for StaticSource {
        async fn list_documents(&self) -> Result<Vec<Document>, DocumentSourceError> {
            Ok(self.0.clone())
        }
    }

    struct UnavailableSource;

    #[async_trait]
    impl DocumentSource for UnavailableSource {
        async fn list_documents(&self) -> Result<Vec<Document>, DocumentSourceError> {
            Err(DocumentSourceError::SourceUnavailable {
                path: "/denied".into(),
                reason: "permission denied".into(),
            })
        }
    }

    /// Blocks inside `list_documents` until released.
    struct GatedSource {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl DocumentSource for GatedSource {
        async fn list_documents(&self) -> Result<Vec<Document>, DocumentSourceError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(vec![Document::new("gated.txt", "gated text")])
        }
    }

    /// Fails a configured number of times per input text; `usize::MAX` means always.
    #[derive(Default)]
    struct ScriptedEmbedder {
        failures: Mutex<HashMap<String, usize>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedEmbedder {
        fn failing(text: &str, times: usize) -> Self {
            let embedder = Self::default();
            embedder
                .failures
                .lock()
                .unwrap()
                .insert(text.to_string(), times);
            embedder
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EmbeddingClient for ScriptedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
            self.calls.lock().unwrap().push(text.to_string());
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(text)
                && *remaining > 0
            {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                return Err(EmbeddingClientError::UnexpectedStatus {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "overloaded".into(),
                });
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[derive(Default)]
    struct RecordingIndex {
        records: Mutex<Vec<Record>>,
        reject_filename: Option<String>,
    }

    impl RecordingIndex {
        fn records(&self) -> Vec<Record> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VectorIndex for RecordingIndex {
        async fn upsert(&self, record: &Record) -> Result<(), PineconeError> {
            if self.reject_filename.as_deref() == Some(record.metadata.filename.as_str()) {
                return Err(PineconeError::UnexpectedStatus {
                    status: StatusCode::BAD_REQUEST,
                    body: "dimension mismatch".into(),
                });
            }
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn query(&self, _request: &QueryRequest) -> Result<Vec<IndexMatch>, PineconeError> {
            Ok(Vec::new())
        }
    }

    fn orchestrator(
        source: Arc<dyn DocumentSource>,
        embedder: Arc<ScriptedEmbedder>,
        index: Arc<RecordingIndex>,
    ) -> IngestionOrchestrator {
        IngestionOrchestrator::new(
            source,
            Arc::new(DocumentExtractor::new()),
            embedder,
            index,
            RetryPolicy::new(5, Duration::from_millis(5000)),
            Arc::new(IngestMetrics::new()),
        )
    }

    fn docs(items: &[(&str, &str)]) -> Arc<StaticSource> {
        Arc::new(StaticSource(
            items
                .iter()
                .map(|(name, text)| Document::new(*name, *text))
                .collect(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn retries_embedding_until_fifth_attempt_succeeds() {
        let embedder = Arc::new(ScriptedEmbedder::failing("flaky text", 4));
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = orchestrator(
            docs(&[("flaky.txt", "flaky   text")]),
            embedder.clone(),
            index.clone(),
        );

        let started = tokio::time::Instant::now();
        let report = orchestrator.run().await.expect("run");
        let elapsed = started.elapsed();

        assert_eq!(embedder.calls().len(), 5);
        assert!(
            elapsed >= Duration::from_millis(20_000) && elapsed < Duration::from_millis(20_010),
            "expected four 5000 ms delays, got {elapsed:?}"
        );
        let records = index.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].metadata.filename, "flaky.txt");
        assert_eq!(records[0].metadata.text_snippet, "flaky   text");
        assert_eq!(report.records_upserted, vec![records[0].id.clone()]);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_embedding_skips_document() {
        let embedder = Arc::new(ScriptedEmbedder::failing("doomed", usize::MAX));
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = orchestrator(docs(&[("doomed.txt", "doomed")]), embedder.clone(), index.clone());

        let report = orchestrator.run().await.expect("run completes");

        assert_eq!(embedder.calls().len(), 5);
        assert!(index.records().is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].name, "doomed.txt");
        assert_eq!(report.skipped[0].stage, "embedding");
        assert!(report.skipped[0].reason.contains("5 attempt"));
        assert_eq!(orchestrator.metrics_snapshot().documents_skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failing_document_does_not_stop_the_batch() {
        let embedder = Arc::new(ScriptedEmbedder::failing("second", usize::MAX));
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = orchestrator(
            docs(&[("1.txt", "first"), ("2.txt", "second"), ("3.txt", "third")]),
            embedder.clone(),
            index.clone(),
        );

        let report = orchestrator.run().await.expect("run");

        let filenames: Vec<_> = index
            .records()
            .into_iter()
            .map(|record| record.metadata.filename)
            .collect();
        assert_eq!(filenames, vec!["1.txt", "3.txt"]);
        assert_eq!(report.records_upserted.len(), 2);

        let mut expected_calls = vec!["first".to_string()];
        expected_calls.extend(std::iter::repeat_n("second".to_string(), 5));
        expected_calls.push("third".to_string());
        assert_eq!(embedder.calls(), expected_calls);

        let snapshot = orchestrator.metrics_snapshot();
        assert_eq!(snapshot.documents_upserted, 2);
        assert_eq!(snapshot.documents_skipped, 1);
        assert_eq!(snapshot.runs_completed, 1);
    }

    #[tokio::test]
    async fn rerunning_unchanged_input_duplicates_records() {
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = orchestrator(
            docs(&[("same.txt", "unchanged content")]),
            Arc::new(ScriptedEmbedder::default()),
            index.clone(),
        );

        orchestrator.run().await.expect("first run");
        orchestrator.run().await.expect("second run");

        let records = index.records();
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
        assert_eq!(records[0].metadata, records[1].metadata);
        assert_eq!(records[0].values, records[1].values);
    }

    #[tokio::test]
    async fn empty_source_upserts_nothing() {
        let embedder = Arc::new(ScriptedEmbedder::default());
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = orchestrator(docs(&[]), embedder.clone(), index.clone());

        let report = orchestrator.run().await.expect("run");

        assert_eq!(report.documents_listed, 0);
        assert!(report.records_upserted.is_empty());
        assert!(embedder.calls().is_empty());
        assert!(index.records().is_empty());
        assert_eq!(orchestrator.metrics_snapshot().runs_completed, 1);
    }

    #[tokio::test]
    async fn unavailable_source_counts_as_no_documents() {
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = orchestrator(
            Arc::new(UnavailableSource),
            Arc::new(ScriptedEmbedder::default()),
            index.clone(),
        );

        let report = orchestrator.run().await.expect("run");
        assert_eq!(report.documents_listed, 0);
        assert!(index.records().is_empty());
    }

    #[tokio::test]
    async fn extraction_failure_skips_without_embedding() {
        let embedder = Arc::new(ScriptedEmbedder::default());
        let index = Arc::new(RecordingIndex::default());
        let source = Arc::new(StaticSource(vec![
            Document::new("blank.txt", "   \n  "),
            Document::new("binary.bin", vec![0xffu8, 0xfe, 0x00]),
            Document::new("ok.txt", "usable"),
        ]));
        let orchestrator = orchestrator(source, embedder.clone(), index.clone());

        let report = orchestrator.run().await.expect("run");

        assert_eq!(embedder.calls(), vec!["usable".to_string()]);
        assert_eq!(index.records().len(), 1);
        let stages: Vec<_> = report.skipped.iter().map(|skip| skip.stage).collect();
        assert_eq!(stages, vec!["extraction", "extraction"]);
    }

    #[tokio::test]
    async fn store_failure_is_isolated() {
        let index = Arc::new(RecordingIndex {
            reject_filename: Some("bad.txt".into()),
            ..RecordingIndex::default()
        });
        let orchestrator = orchestrator(
            docs(&[("bad.txt", "rejected"), ("good.txt", "accepted")]),
            Arc::new(ScriptedEmbedder::default()),
            index.clone(),
        );

        let report = orchestrator.run().await.expect("run");

        assert_eq!(index.records().len(), 1);
        assert_eq!(index.records()[0].metadata.filename, "good.txt");
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].stage, "store");
    }

    #[tokio::test]
    async fn overlapping_run_is_rejected() {
        let source = Arc::new(GatedSource {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let index = Arc::new(RecordingIndex::default());
        let orchestrator = Arc::new(orchestrator(
            source.clone(),
            Arc::new(ScriptedEmbedder::default()),
            index.clone(),
        ));

        let first = tokio::spawn({
            let orchestrator = orchestrator.clone();
            async move { orchestrator.run().await }
        });
        source.entered.notified().await;
        assert!(orchestrator.is_running());

        let overlapping = orchestrator.run().await;
        assert!(matches!(overlapping, Err(RunError::AlreadyRunning)));

        source.release.notify_one();
        let report = first.await.expect("join").expect("first run");
        assert_eq!(report.records_upserted.len(), 1);
        assert!(!orchestrator.is_running());

        let snapshot = orchestrator.metrics_snapshot();
        assert_eq!(snapshot.runs_rejected, 1);
        assert_eq!(snapshot.runs_completed, 1);
        assert_eq!(index.records().len(), 1);
    }
}
