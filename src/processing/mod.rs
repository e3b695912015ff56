//! Ingestion pipeline: text cleaning, retry, record construction, and orchestration.

pub mod cache;
mod orchestrator;
pub mod record;
pub mod retry;
pub mod sanitize;
mod service;
pub mod types;

pub use cache::RecordCache;
pub use orchestrator::IngestionOrchestrator;
pub use record::{Record, RecordMetadata};
pub use retry::{RetryExhausted, RetryPolicy};
pub use service::{IngestionApi, IngestionService};
pub use types::{AskError, DocumentError, RunError, RunReport, SkippedDocument};
