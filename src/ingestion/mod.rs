//! Upload and structuring pipeline
//!
//! extract → structure → embed → index upsert → document row → bound
//! conversation with seed message. Steps are best-effort sequential: a
//! failure after the vector upsert leaves the orphaned vector in place
//! (no compensation), by design.

pub mod extract;

pub use extract::extract_text;

use chrono::Utc;
use serde_json::{json, Map};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{
    ChatMessage, ChatProvider, EmbeddingProvider, VectorIndexProvider, VectorRecord,
    DOCUMENT_FILTER_KEY,
};
use crate::qa::QaEngine;
use crate::storage::{DocumentStore, NewDocument};
use crate::types::response::UploadResponse;
use crate::types::DocumentStructure;

/// Characters of raw text stored on the document row
const EXCERPT_CHARS: usize = 500;
/// Characters of raw text carried in vector metadata (returned as context)
const METADATA_TEXT_CHARS: usize = 300;

/// The upload pipeline
#[derive(Clone)]
pub struct UploadPipeline {
    documents: DocumentStore,
    embedding: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    vector_index: Arc<dyn VectorIndexProvider>,
    qa: QaEngine,
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl UploadPipeline {
    /// Create a pipeline over the given store and gateways. Conversation
    /// binding is delegated to the query engine so both paths share one
    /// creation-and-seed routine.
    pub fn new(
        documents: DocumentStore,
        embedding: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        vector_index: Arc<dyn VectorIndexProvider>,
        qa: QaEngine,
    ) -> Self {
        Self {
            documents,
            embedding,
            chat,
            vector_index,
            qa,
        }
    }

    /// Process an uploaded file end to end.
    ///
    /// Typed `NotFound`/`BadRequest` failures surface unchanged; everything
    /// else is re-signaled as `UploadFailed`.
    pub async fn upload_document(
        &self,
        data: &[u8],
        original_name: &str,
        mime_type: Option<&str>,
    ) -> Result<UploadResponse> {
        self.upload_inner(data, original_name, mime_type)
            .await
            .map_err(Error::into_upload_failed)
    }

    async fn upload_inner(
        &self,
        data: &[u8],
        original_name: &str,
        mime_type: Option<&str>,
    ) -> Result<UploadResponse> {
        let mime_type = mime_type.map(str::to_string).unwrap_or_else(|| {
            mime_guess::from_path(original_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        });

        tracing::info!("Uploading '{}' ({}, {} bytes)", original_name, mime_type, data.len());

        let raw_text = extract::extract_text(data, &mime_type, original_name)?;
        let structure = self.structure_text(original_name, &raw_text).await?;
        let embedding = self.embedding.embed(&raw_text).await?;

        let vector_id = format!("{}-{}", original_name, Utc::now().timestamp_millis());

        let mut metadata = Map::new();
        metadata.insert("filename".to_string(), json!(original_name));
        metadata.insert("title".to_string(), json!(structure.title));
        metadata.insert("summary".to_string(), json!(structure.summary));
        metadata.insert("keywords".to_string(), json!(structure.keywords.join(", ")));
        metadata.insert("text".to_string(), json!(excerpt(&raw_text, METADATA_TEXT_CHARS)));
        metadata.insert(DOCUMENT_FILTER_KEY.to_string(), json!(vector_id));

        self.vector_index
            .upsert(&[VectorRecord {
                id: vector_id.clone(),
                values: embedding,
                metadata,
            }])
            .await?;

        let document = self.documents.create(NewDocument {
            filename: vector_id.clone(),
            original_name: original_name.to_string(),
            mime_type,
            title: Some(structure.title.clone()),
            summary: Some(structure.summary.clone()),
            keywords: structure.keywords.clone(),
            vector_id: vector_id.clone(),
            extracted_text: Some(excerpt(&raw_text, EXCERPT_CHARS)),
        })?;

        let conversation = self.qa.conversation_for_document(&document)?;

        tracing::info!(
            "Uploaded '{}' as document {} (conversation {})",
            original_name,
            document.id,
            conversation.id
        );

        Ok(UploadResponse {
            status: "uploaded".to_string(),
            filename: original_name.to_string(),
            vector_id,
            document_id: document.id,
            conversation_id: conversation.id,
            structure,
        })
    }

    /// Ask the chat model to structure the raw text; fall back to a
    /// filename-derived structure when the output is not valid JSON.
    async fn structure_text(&self, filename: &str, raw_text: &str) -> Result<DocumentStructure> {
        let prompt = vec![
            ChatMessage::system("You analyze documents and return structured JSON metadata."),
            ChatMessage::user(PromptBuilder::build_structure_prompt(raw_text)),
        ];

        let completion = self.chat.complete(&prompt).await?;
        Ok(parse_structure(&completion.content, filename, raw_text))
    }
}

fn parse_structure(content: &str, filename: &str, raw_text: &str) -> DocumentStructure {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed).trim();

    match serde_json::from_str(trimmed) {
        Ok(structure) => structure,
        Err(e) => {
            tracing::warn!("Structuring output for '{}' was not valid JSON: {}", filename, e);
            DocumentStructure::fallback(filename, raw_text)
        }
    }
}
