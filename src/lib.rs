#![deny(missing_docs)]

//! Core library for the scheduled document ingestion service.

/// Admin HTTP routing and handlers.
pub mod api;
/// Chat completion client grounded on cached records.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Document discovery and text extraction.
pub mod documents;
/// Embedding client abstraction and the OpenAI adapter.
pub mod embedding;
mod http;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Pinecone vector index integration.
pub mod pinecone;
/// Ingestion pipeline: retry, records, orchestration.
pub mod processing;
/// Cron-driven run trigger.
pub mod scheduler;
