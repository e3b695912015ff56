use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    runs_completed: AtomicU64,
    runs_rejected: AtomicU64,
    documents_upserted: AtomicU64,
    documents_skipped: AtomicU64,
    last_run_at: Mutex<Option<DateTime<Utc>>>,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document whose record reached the index.
    pub fn record_upsert(&self) {
        self.documents_upserted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a document dropped from the current run.
    pub fn record_skip(&self) {
        self.documents_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a run turned away because another run was in progress.
    pub fn record_rejected_run(&self) {
        self.runs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the completion of a run.
    pub fn record_run_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_run_at.lock() {
            *last = Some(Utc::now());
        }
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let last_run_at = self
            .last_run_at
            .lock()
            .ok()
            .and_then(|last| *last)
            .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true));

        MetricsSnapshot {
            runs_completed: self.runs_completed.load(Ordering::Relaxed),
            runs_rejected: self.runs_rejected.load(Ordering::Relaxed),
            documents_upserted: self.documents_upserted.load(Ordering::Relaxed),
            documents_skipped: self.documents_skipped.load(Ordering::Relaxed),
            last_run_at,
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Runs that went through the whole document list since startup.
    pub runs_completed: u64,
    /// Runs refused because another run was still executing.
    pub runs_rejected: u64,
    /// Documents whose record was upserted into the index.
    pub documents_upserted: u64,
    /// Documents skipped after an extraction, embedding, or store failure.
    pub documents_skipped: u64,
    /// RFC 3339 timestamp of the last completed run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_documents_and_runs() {
        let metrics = IngestMetrics::new();
        metrics.record_upsert();
        metrics.record_upsert();
        metrics.record_skip();
        metrics.record_rejected_run();
        metrics.record_run_completed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_upserted, 2);
        assert_eq!(snapshot.documents_skipped, 1);
        assert_eq!(snapshot.runs_rejected, 1);
        assert_eq!(snapshot.runs_completed, 1);
        assert!(snapshot.last_run_at.is_some());
    }

    #[test]
    fn snapshot_starts_empty() {
        let snapshot = IngestMetrics::new().snapshot();
        assert_eq!(snapshot.runs_completed, 0);
        assert_eq!(snapshot.documents_upserted, 0);
        assert!(snapshot.last_run_at.is_none());
    }
}
