//! In-memory view of records already in the index, loaded once at startup.

use crate::pinecone::{IndexMatch, QueryRequest, VectorIndex};
use tokio::sync::RwLock;

/// Records fetched from the index by a seed similarity query.
#[derive(Default)]
pub struct RecordCache {
    records: RwLock<Vec<IndexMatch>>,
}

impl RecordCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache contents with the top `top_k` matches for the seed vector.
    ///
    /// Query failures are logged and leave the cache empty; the returned count is what was loaded.
    pub async fn seed(&self, index: &dyn VectorIndex, dimension: usize, top_k: usize) -> usize {
        let request = QueryRequest {
            vector: seed_vector(dimension),
            top_k,
            include_metadata: true,
            include_values: true,
        };

        let matches = match index.query(&request).await {
            Ok(matches) => matches,
            Err(error) => {
                tracing::error!(error = %error, "Failed to load records from index");
                Vec::new()
            }
        };

        let count = matches.len();
        *self.records.write().await = matches;
        tracing::info!(records = count, top_k, "Record cache seeded");
        count
    }

    /// Snapshot of the cached records.
    pub async fn records(&self) -> Vec<IndexMatch> {
        self.records.read().await.clone()
    }

    /// First cached record, used as completion context.
    pub async fn first(&self) -> Option<IndexMatch> {
        self.records.read().await.first().cloned()
    }
}

/// Unit vector along the first axis; any non-zero vector works for a cosine index.
pub(crate) fn seed_vector(dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    if let Some(first) = vector.first_mut() {
        *first = 1.0;
    }
    vector
}
