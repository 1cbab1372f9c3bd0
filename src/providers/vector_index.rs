//! Vector index provider trait for nearest-neighbor upsert and query

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Metadata key scoping a vector to one document. Queries for a
/// document-bound conversation filter on this key; it is the sole
/// isolation mechanism between documents in the index.
pub const DOCUMENT_FILTER_KEY: &str = "document_id";

/// One entry to upsert into the index
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Entry id
    pub id: String,
    /// Embedding values
    pub values: Vec<f32>,
    /// Arbitrary metadata returned on query
    pub metadata: Map<String, Value>,
}

/// One nearest-neighbor match
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    /// Entry id
    pub id: String,
    /// Similarity score, higher is more similar
    #[serde(default)]
    pub score: f32,
    /// Metadata stored at upsert time
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl VectorMatch {
    /// The `text` metadata fragment, if the entry carries one
    pub fn text(&self) -> Option<&str> {
        self.metadata.get("text").and_then(Value::as_str)
    }
}

/// Trait for the external nearest-neighbor index
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Insert or overwrite entries
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Query nearest neighbors. `document_filter` constrains matches to
    /// entries whose `DOCUMENT_FILTER_KEY` metadata equals the given value.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        document_filter: Option<&str>,
    ) -> Result<Vec<VectorMatch>>;

    /// Check if the index is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
