//! Conversation threads and their parent-linked messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message within a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Seed/system instruction, excluded from Q&A pairing and rendered history
    System,
    /// A user question
    User,
    /// A model answer, parent-linked to the question it answers
    Assistant,
}

impl MessageRole {
    /// Database column representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Parse the database column representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Self::System),
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persistent thread of messages, optionally bound to one document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique conversation ID
    pub id: Uuid,
    /// Conversation title
    pub title: String,
    /// Bound document, if any (at most one active conversation per document)
    pub document_id: Option<Uuid>,
    /// Soft-deactivation flag
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Bumped on every new exchange
    pub updated_at: DateTime<Utc>,
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message ID
    pub id: Uuid,
    /// Owning conversation
    pub conversation_id: Uuid,
    /// Sender role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// For assistant messages: the user message this answers
    pub parent_id: Option<Uuid>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// A user question paired with its assistant answer, reconstructed via
/// the answer's `parent_id`. The answer is absent while a question is
/// still being processed (or was abandoned mid-stream).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaPair {
    /// The user question
    pub question: Message,
    /// The linked assistant answer, if any
    pub answer: Option<Message>,
    /// Question creation time, for ordering in clients
    pub created_at: DateTime<Utc>,
}
