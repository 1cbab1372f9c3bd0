//! Pinecone-style vector index gateway

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};

use super::vector_index::{VectorIndexProvider, VectorMatch, VectorRecord, DOCUMENT_FILTER_KEY};

/// REST client for a Pinecone-compatible index
pub struct PineconeIndex {
    client: Client,
    config: VectorIndexConfig,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

impl PineconeIndex {
    /// Create a new index client from gateway configuration
    pub fn new(config: &VectorIndexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl VectorIndexProvider for PineconeIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        let url = format!("{}/vectors/upsert", self.config.host);

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.config.api_key)
            .json(&UpsertRequest { vectors: records })
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Vector upsert request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(format!(
                "Vector upsert failed: HTTP {} - {}",
                status, body
            )));
        }

        tracing::debug!("Upserted {} vector(s)", records.len());
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        document_filter: Option<&str>,
    ) -> Result<Vec<VectorMatch>> {
        let url = format!("{}/query", self.config.host);

        let mut body = json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        if let Some(filter_key) = document_filter {
            let mut filter = Map::new();
            filter.insert(DOCUMENT_FILTER_KEY.to_string(), json!({ "$eq": filter_key }));
            body["filter"] = Value::Object(filter);
        }

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("Vector query request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::upstream(format!(
                "Vector query failed: HTTP {}",
                response.status()
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream(format!("Failed to parse query response: {}", e)))?;

        Ok(parsed.matches)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/describe_index_stats", self.config.host);
        match self
            .client
            .post(&url)
            .header("Api-Key", &self.config.api_key)
            .json(&json!({}))
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
