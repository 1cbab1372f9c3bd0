//! Application state for the HTTP server

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::ingestion::UploadPipeline;
use crate::providers::{
    ChatProvider, EmbeddingProvider, OpenAiClient, PineconeIndex, VectorIndexProvider,
};
use crate::qa::QaEngine;
use crate::storage::{ConversationStore, Db, DocumentStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    documents: DocumentStore,
    conversations: ConversationStore,
    qa: QaEngine,
    upload: UploadPipeline,
}

impl AppState {
    /// Wire up stores, gateways, and engines from configuration.
    ///
    /// Gateways are constructed here, once, and passed by reference into the
    /// engines; nothing reads keys or endpoints from the environment after
    /// this point.
    pub fn new(config: AppConfig) -> Result<Self> {
        let db = Db::new(&config.storage.database_path)?;
        let documents = DocumentStore::new(db.clone());
        let conversations = ConversationStore::new(db);
        tracing::info!("Storage initialized at {}", config.storage.database_path.display());

        let gateway = Arc::new(OpenAiClient::new(&config.chat)?);
        let vector_index: Arc<dyn VectorIndexProvider> =
            Arc::new(PineconeIndex::new(&config.vector_index)?);
        let embedding: Arc<dyn EmbeddingProvider> = gateway.clone();
        let chat: Arc<dyn ChatProvider> = gateway;
        tracing::info!(
            "Gateways initialized (chat: {}, embeddings: {})",
            config.chat.completion_model,
            config.chat.embedding_model
        );

        let qa = QaEngine::new(
            documents.clone(),
            conversations.clone(),
            embedding.clone(),
            chat.clone(),
            vector_index.clone(),
            config.retrieval.clone(),
        );

        let upload = UploadPipeline::new(
            documents.clone(),
            embedding,
            chat,
            vector_index,
            qa.clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                documents,
                conversations,
                qa,
                upload,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the document store
    pub fn documents(&self) -> &DocumentStore {
        &self.inner.documents
    }

    /// Get the conversation store
    pub fn conversations(&self) -> &ConversationStore {
        &self.inner.conversations
    }

    /// Get the query engine
    pub fn qa(&self) -> &QaEngine {
        &self.inner.qa
    }

    /// Get the upload pipeline
    pub fn upload(&self) -> &UploadPipeline {
        &self.inner.upload
    }
}
