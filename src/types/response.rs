//! Response types for the HTTP surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::{Message, MessageRole, QaPair};
use super::document::{Document, DocumentStructure};

/// Result of a batch query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Conversation the exchange was recorded on
    pub conversation_id: Uuid,
    /// Bound document, if the conversation has one
    pub document_id: Option<Uuid>,
    /// The question as asked
    pub question: String,
    /// The generated answer
    pub answer: String,
    /// When the answer was produced
    pub timestamp: DateTime<Utc>,
}

/// Result of a document upload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Always "uploaded" on success
    pub status: String,
    /// Original filename
    pub filename: String,
    /// Vector-index entry id
    pub vector_id: String,
    /// Persisted document id
    pub document_id: Uuid,
    /// Auto-created bound conversation id
    pub conversation_id: Uuid,
    /// Model-derived structure
    pub structure: DocumentStructure,
}

/// Last message excerpt shown in conversation summaries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    /// Truncated content
    pub content: String,
    /// Sender role
    pub role: MessageRole,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Summary of a document's bound conversation for list views
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id
    pub id: Uuid,
    /// Conversation title
    pub title: String,
    /// Number of messages in the thread
    pub message_count: usize,
    /// Most recent message, truncated
    pub last_message: Option<LastMessage>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last activity
    pub updated_at: DateTime<Utc>,
}

/// A document decorated with its conversation summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentWithConversation {
    /// The document record
    #[serde(flatten)]
    pub document: Document,
    /// Its bound active conversation, if any
    pub conversation: Option<ConversationSummary>,
}

/// Response of GET /api/documents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsResponse {
    /// Matching documents, newest first by default
    pub documents: Vec<DocumentWithConversation>,
    /// Number of matches
    pub total: usize,
    /// Echo of the keyword filter, if one was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_keyword: Option<String>,
}

/// Reference to the document a conversation is bound to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    /// Document id
    pub id: Uuid,
    /// Original filename
    pub original_name: String,
    /// Derived title
    pub title: Option<String>,
}

impl From<&Document> for DocumentRef {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            original_name: doc.original_name.clone(),
            title: doc.title.clone(),
        }
    }
}

/// Grouped Q&A view of a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessagesResponse {
    /// Conversation id
    pub conversation_id: Uuid,
    /// Conversation title
    pub title: String,
    /// Bound document id, if any
    pub document_id: Option<Uuid>,
    /// Bound document reference, if any
    pub document: Option<DocumentRef>,
    /// Total message count (system included)
    pub message_count: usize,
    /// System messages, never part of pairs
    pub system_messages: Vec<Message>,
    /// Question/answer pairs in ascending question order
    pub question_answer_pairs: Vec<QaPair>,
    /// Conversation creation time
    pub created_at: DateTime<Utc>,
    /// Last activity
    pub updated_at: DateTime<Utc>,
}
