//! Request types for the query and document-listing endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body of POST /api/documents/query and /api/documents/query/stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
    /// Existing conversation to continue
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
    /// Document to scope the conversation and retrieval to
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

/// Sortable document columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    OriginalName,
}

impl SortField {
    /// Whitelisted column name for ORDER BY
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Title => "title",
            Self::OriginalName => "original_name",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// SQL keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query params of GET /api/documents
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSearchParams {
    /// Keyword substring matched across name/title/summary/text/keywords
    #[serde(default)]
    pub keyword: Option<String>,
    /// Sort column
    #[serde(default)]
    pub sort_by: SortField,
    /// Sort direction
    #[serde(default)]
    pub sort_order: SortOrder,
}
