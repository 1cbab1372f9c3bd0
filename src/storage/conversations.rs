//! Conversation and message store
//!
//! Append-only log of per-conversation messages with parent/child Q&A
//! pairing. Conversations soft-deactivate; messages are never deleted.

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::Db;
use crate::types::response::{ConversationSummary, LastMessage};
use crate::types::{truncate_chars, Conversation, Message, MessageRole, QaPair};

/// Store for conversations and their messages
#[derive(Clone)]
pub struct ConversationStore {
    db: Db,
}

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    let id: String = row.get("id")?;
    let document_id: Option<String> = row.get("document_id")?;
    Ok(Conversation {
        id: id.parse().unwrap_or_default(),
        title: row.get("title")?,
        document_id: document_id.and_then(|s| s.parse().ok()),
        is_active: row.get::<_, i64>("is_active")? != 0,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let id: String = row.get("id")?;
    let conversation_id: String = row.get("conversation_id")?;
    let role: String = row.get("role")?;
    let parent_id: Option<String> = row.get("parent_id")?;
    Ok(Message {
        id: id.parse().unwrap_or_default(),
        conversation_id: conversation_id.parse().unwrap_or_default(),
        role: MessageRole::parse(&role).unwrap_or(MessageRole::User),
        content: row.get("content")?,
        parent_id: parent_id.and_then(|s| s.parse().ok()),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

impl ConversationStore {
    /// Create a store over the shared database handle
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create a conversation, optionally bound to a document.
    pub fn create_conversation(
        &self,
        title: &str,
        document_id: Option<Uuid>,
    ) -> Result<Conversation> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            title: title.to_string(),
            document_id,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO conversations (id, title, document_id, is_active, created_at, updated_at)
                VALUES (?1, ?2, ?3, 1, ?4, ?5)
                "#,
                params![
                    conversation.id.to_string(),
                    conversation.title,
                    conversation.document_id.map(|id| id.to_string()),
                    conversation.created_at,
                    conversation.updated_at,
                ],
            )
        })?;

        tracing::debug!("Created conversation {} ('{}')", conversation.id, conversation.title);
        Ok(conversation)
    }

    /// Look up an active conversation by id.
    pub fn get_conversation(&self, id: Uuid) -> Result<Conversation> {
        let found = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT * FROM conversations WHERE id = ?1 AND is_active = 1",
                params![id.to_string()],
                row_to_conversation,
            )
            .optional()
        })?;

        found.ok_or_else(|| Error::not_found(format!("Conversation {} not found", id)))
    }

    /// Find the active conversation bound to a document, if one exists.
    pub fn find_active_by_document(&self, document_id: Uuid) -> Result<Option<Conversation>> {
        self.db.with_conn(|conn| {
            conn.query_row(
                r#"
                SELECT * FROM conversations
                WHERE document_id = ?1 AND is_active = 1
                ORDER BY created_at ASC
                LIMIT 1
                "#,
                params![document_id.to_string()],
                row_to_conversation,
            )
            .optional()
        })
    }

    /// Append a message to a conversation.
    ///
    /// Fails with `NotFound` when the conversation is absent or inactive.
    /// A supplied `parent_id` must reference a message in the same
    /// conversation; a dangling or cross-conversation parent is `BadRequest`.
    pub fn create_message(
        &self,
        conversation_id: Uuid,
        role: MessageRole,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Message> {
        self.get_conversation(conversation_id)?;

        if let Some(parent) = parent_id {
            let owner: Option<String> = self.db.with_conn(|conn| {
                conn.query_row(
                    "SELECT conversation_id FROM messages WHERE id = ?1",
                    params![parent.to_string()],
                    |row| row.get(0),
                )
                .optional()
            })?;

            match owner {
                None => {
                    return Err(Error::bad_request(format!(
                        "Parent message {} does not exist",
                        parent
                    )))
                }
                Some(owner) if owner != conversation_id.to_string() => {
                    return Err(Error::bad_request(format!(
                        "Parent message {} belongs to a different conversation",
                        parent
                    )))
                }
                Some(_) => {}
            }
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            role,
            content: content.to_string(),
            parent_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO messages (id, conversation_id, role, content, parent_id, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.role.as_str(),
                    message.content,
                    message.parent_id.map(|id| id.to_string()),
                    message.created_at,
                    message.updated_at,
                ],
            )
        })?;

        Ok(message)
    }

    /// All messages of a conversation in creation order. Unbounded; callers
    /// are responsible for windowing.
    pub fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        self.get_conversation(conversation_id)?;

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM messages
                WHERE conversation_id = ?1
                ORDER BY created_at ASC, rowid ASC
                "#,
            )?;
            let rows = stmt.query_map(params![conversation_id.to_string()], row_to_message)?;
            rows.collect()
        })
    }

    /// Reconstruct the conversation as system messages plus ordered Q&A pairs.
    ///
    /// For every user message in creation order, the assistant message (if
    /// any) whose `parent_id` matches it becomes the answer. Questions still
    /// being processed yield a pair with no answer.
    pub fn qa_pairs(&self, conversation_id: Uuid) -> Result<(Vec<Message>, Vec<QaPair>)> {
        let messages = self.list_messages(conversation_id)?;

        let system: Vec<Message> = messages
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .cloned()
            .collect();

        let pairs: Vec<QaPair> = messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|question| {
                let answer = messages
                    .iter()
                    .find(|m| m.role == MessageRole::Assistant && m.parent_id == Some(question.id))
                    .cloned();
                QaPair {
                    created_at: question.created_at,
                    question: question.clone(),
                    answer,
                }
            })
            .collect();

        Ok((system, pairs))
    }

    /// Summarize a conversation for list views: message count plus a
    /// truncated excerpt of the latest message.
    pub fn summary(&self, conversation: &Conversation) -> Result<ConversationSummary> {
        let messages = self.list_messages(conversation.id)?;
        let last_message = messages.last().map(|m| LastMessage {
            content: truncate_chars(&m.content, 100),
            role: m.role,
            created_at: m.created_at,
        });

        Ok(ConversationSummary {
            id: conversation.id,
            title: conversation.title.clone(),
            message_count: messages.len(),
            last_message,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }

    /// Bump a conversation's `updated_at` to now.
    pub fn touch(&self, conversation_id: Uuid) -> Result<()> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE conversations SET updated_at = ?1 WHERE id = ?2",
                params![Utc::now(), conversation_id.to_string()],
            )
        })?;

        if updated == 0 {
            return Err(Error::not_found(format!(
                "Conversation {} not found",
                conversation_id
            )));
        }
        Ok(())
    }

    /// Soft-deactivate a conversation. Its messages are retained.
    pub fn deactivate_conversation(&self, id: Uuid) -> Result<()> {
        let conversation = self.get_conversation(id)?;

        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE conversations SET is_active = 0, updated_at = ?1 WHERE id = ?2",
                params![Utc::now(), conversation.id.to_string()],
            )
        })?;

        tracing::debug!("Deactivated conversation {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ConversationStore {
        ConversationStore::new(Db::in_memory().unwrap())
    }

    #[test]
    fn create_and_get_conversation() {
        let store = store();
        let conv = store.create_conversation("Chat about report.pdf", None).unwrap();

        let fetched = store.get_conversation(conv.id).unwrap();
        assert_eq!(fetched.id, conv.id);
        assert_eq!(fetched.title, "Chat about report.pdf");
        assert!(fetched.is_active);
        assert!(fetched.document_id.is_none());
    }

    #[test]
    fn unknown_conversation_is_not_found() {
        let store = store();
        let err = store.get_conversation(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn deactivated_conversation_is_not_found_but_keeps_messages() {
        let store = store();
        let conv = store.create_conversation("t", None).unwrap();
        store
            .create_message(conv.id, MessageRole::User, "hello", None)
            .unwrap();

        store.deactivate_conversation(conv.id).unwrap();

        let err = store.get_conversation(conv.id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        // Messages survive deactivation; only the conversation lookup fails
        let count: i64 = store
            .db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
                    params![conv.id.to_string()],
                    |row| row.get(0),
                )
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn message_on_inactive_conversation_is_not_found() {
        let store = store();
        let conv = store.create_conversation("t", None).unwrap();
        store.deactivate_conversation(conv.id).unwrap();

        let err = store
            .create_message(conv.id, MessageRole::User, "q", None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn parent_must_exist() {
        let store = store();
        let conv = store.create_conversation("t", None).unwrap();

        let err = store
            .create_message(conv.id, MessageRole::Assistant, "a", Some(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn parent_must_belong_to_same_conversation() {
        let store = store();
        let conv_a = store.create_conversation("a", None).unwrap();
        let conv_b = store.create_conversation("b", None).unwrap();
        let question = store
            .create_message(conv_a.id, MessageRole::User, "q", None)
            .unwrap();

        let err = store
            .create_message(conv_b.id, MessageRole::Assistant, "a", Some(question.id))
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));

        // Same conversation is fine
        store
            .create_message(conv_a.id, MessageRole::Assistant, "a", Some(question.id))
            .unwrap();
    }

    #[test]
    fn messages_come_back_in_creation_order() {
        let store = store();
        let conv = store.create_conversation("t", None).unwrap();
        for i in 0..5 {
            store
                .create_message(conv.id, MessageRole::User, &format!("msg {}", i), None)
                .unwrap();
        }

        let messages = store.list_messages(conv.id).unwrap();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn qa_pairs_link_answers_by_parent() {
        let store = store();
        let conv = store.create_conversation("t", None).unwrap();

        store
            .create_message(conv.id, MessageRole::System, "seed", None)
            .unwrap();
        let q1 = store
            .create_message(conv.id, MessageRole::User, "first?", None)
            .unwrap();
        store
            .create_message(conv.id, MessageRole::Assistant, "first answer", Some(q1.id))
            .unwrap();
        let q2 = store
            .create_message(conv.id, MessageRole::User, "second?", None)
            .unwrap();
        // q2 is still unanswered

        let (system, pairs) = store.qa_pairs(conv.id).unwrap();

        assert_eq!(system.len(), 1);
        assert_eq!(system[0].content, "seed");

        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].question.id, q1.id);
        let answer = pairs[0].answer.as_ref().unwrap();
        assert_eq!(answer.parent_id, Some(q1.id));
        assert_eq!(answer.content, "first answer");

        assert_eq!(pairs[1].question.id, q2.id);
        assert!(pairs[1].answer.is_none());

        // Ascending question-creation-time order
        assert!(pairs[0].created_at <= pairs[1].created_at);
    }

    #[test]
    fn find_active_by_document_reuses_binding() {
        let store = store();
        let doc_id = Uuid::new_v4();

        assert!(store.find_active_by_document(doc_id).unwrap().is_none());

        let conv = store
            .create_conversation("Chat about doc", Some(doc_id))
            .unwrap();
        let found = store.find_active_by_document(doc_id).unwrap().unwrap();
        assert_eq!(found.id, conv.id);

        store.deactivate_conversation(conv.id).unwrap();
        assert!(store.find_active_by_document(doc_id).unwrap().is_none());
    }

    #[test]
    fn summary_counts_messages_and_truncates_last() {
        let store = store();
        let conv = store.create_conversation("t", None).unwrap();
        store
            .create_message(conv.id, MessageRole::User, &"x".repeat(200), None)
            .unwrap();

        let summary = store.summary(&conv).unwrap();
        assert_eq!(summary.message_count, 1);
        let last = summary.last_message.unwrap();
        assert!(last.content.len() <= 103); // 100 chars + ellipsis
        assert!(last.content.ends_with("..."));
    }

    #[test]
    fn touch_bumps_updated_at() {
        let store = store();
        let conv = store.create_conversation("t", None).unwrap();
        store.touch(conv.id).unwrap();

        let fetched = store.get_conversation(conv.id).unwrap();
        assert!(fetched.updated_at >= conv.updated_at);

        let err = store.touch(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
