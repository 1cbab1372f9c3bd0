//! Retrieval-augmented query orchestrator
//!
//! Binds questions to conversation threads, retrieves document-scoped
//! context, composes the grounded prompt, invokes the model (batch or
//! streaming), and records the exchange with parent-linked messages.

use chrono::Utc;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{
    ChatMessage, ChatProvider, EmbeddingProvider, TokenStream, VectorIndexProvider,
};
use crate::storage::{ConversationStore, DocumentStore};
use crate::types::response::QueryResponse;
use crate::types::{Conversation, Document, Message, MessageRole, QueryRequest};

/// Number of previous messages rendered into the prompt. A fixed message
/// count, not a token budget.
pub const HISTORY_WINDOW: usize = 10;

/// Capacity of the fragment channel between the model stream and the
/// transport. A stalled consumer blocks the producer instead of buffering
/// tokens without bound.
const STREAM_BUFFER: usize = 32;

/// One event of a streamed answer
#[derive(Debug, Clone)]
pub enum AnswerEvent {
    /// An incremental text fragment
    Delta(String),
    /// Generation or persistence failed after the stream started
    Error(String),
    /// The answer is complete and persisted
    Done(QueryResponse),
}

/// Everything resolved before the model is invoked
struct PreparedQuery {
    conversation: Conversation,
    document: Option<Document>,
    question: Message,
    prompt: Vec<ChatMessage>,
}

/// The query orchestrator
#[derive(Clone)]
pub struct QaEngine {
    documents: DocumentStore,
    conversations: ConversationStore,
    embedding: Arc<dyn EmbeddingProvider>,
    chat: Arc<dyn ChatProvider>,
    vector_index: Arc<dyn VectorIndexProvider>,
    retrieval: RetrievalConfig,
}

impl QaEngine {
    /// Create an engine over the given stores and gateways
    pub fn new(
        documents: DocumentStore,
        conversations: ConversationStore,
        embedding: Arc<dyn EmbeddingProvider>,
        chat: Arc<dyn ChatProvider>,
        vector_index: Arc<dyn VectorIndexProvider>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            documents,
            conversations,
            embedding,
            chat,
            vector_index,
            retrieval,
        }
    }

    /// Answer a question and return the full response.
    ///
    /// Typed `NotFound`/`BadRequest` failures surface unchanged; everything
    /// else is re-signaled as `QueryFailed`.
    pub async fn answer_question(&self, request: &QueryRequest) -> Result<QueryResponse> {
        self.answer_inner(request)
            .await
            .map_err(Error::into_query_failed)
    }

    async fn answer_inner(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let prepared = self.prepare(request).await?;

        let completion = self.chat.complete(&prepared.prompt).await?;
        self.persist_answer(&prepared.conversation, &prepared.question, &completion.content)?;

        tracing::info!(
            "Answered question on conversation {} ({} tokens)",
            prepared.conversation.id,
            completion.tokens_used
        );

        Ok(QueryResponse {
            conversation_id: prepared.conversation.id,
            document_id: prepared.document.as_ref().map(|d| d.id),
            question: prepared.question.content,
            answer: completion.content,
            timestamp: Utc::now(),
        })
    }

    /// Answer a question as a lazy fragment stream.
    ///
    /// Resolution, question persistence, retrieval, and prompt assembly run
    /// before this returns, so setup failures surface as a plain error
    /// rather than an in-band event. The full answer is persisted only
    /// after the model stream completes; if the consumer drops the stream
    /// the producer stops pulling tokens and the partial answer is
    /// discarded, leaving an unanswered question in the thread.
    pub async fn answer_question_stream(
        &self,
        request: &QueryRequest,
    ) -> Result<ReceiverStream<AnswerEvent>> {
        let prepared = self
            .prepare(request)
            .await
            .map_err(Error::into_query_failed)?;

        let stream = self
            .chat
            .complete_stream(&prepared.prompt)
            .await
            .map_err(Error::into_query_failed)?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let engine = self.clone();
        tokio::spawn(async move {
            engine.pump_stream(stream, prepared, tx).await;
        });

        Ok(ReceiverStream::new(rx))
    }

    async fn pump_stream(
        &self,
        mut stream: TokenStream,
        prepared: PreparedQuery,
        tx: mpsc::Sender<AnswerEvent>,
    ) {
        let mut answer = String::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    answer.push_str(&fragment);
                    if tx.send(AnswerEvent::Delta(fragment)).await.is_err() {
                        tracing::info!(
                            "Client disconnected mid-stream on conversation {}; partial answer discarded",
                            prepared.conversation.id
                        );
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "Generation failed mid-stream on conversation {}: {}",
                        prepared.conversation.id,
                        e
                    );
                    let _ = tx
                        .send(AnswerEvent::Error(e.into_query_failed().to_string()))
                        .await;
                    return;
                }
            }
        }

        match self.persist_answer(&prepared.conversation, &prepared.question, &answer) {
            Ok(()) => {
                let response = QueryResponse {
                    conversation_id: prepared.conversation.id,
                    document_id: prepared.document.as_ref().map(|d| d.id),
                    question: prepared.question.content.clone(),
                    answer,
                    timestamp: Utc::now(),
                };
                let _ = tx.send(AnswerEvent::Done(response)).await;
            }
            Err(e) => {
                let _ = tx
                    .send(AnswerEvent::Error(e.into_query_failed().to_string()))
                    .await;
            }
        }
    }

    /// Steps shared by the batch and streaming paths: resolve the
    /// conversation, persist the question, load bounded history, retrieve
    /// context, and compose the grounded prompt.
    async fn prepare(&self, request: &QueryRequest) -> Result<PreparedQuery> {
        let question_text = request.question.trim();
        if question_text.is_empty() {
            return Err(Error::bad_request("Question must not be empty"));
        }

        let (conversation, document) =
            self.resolve_conversation(request.conversation_id, request.document_id)?;

        let question =
            self.conversations
                .create_message(conversation.id, MessageRole::User, question_text, None)?;

        let history = self.load_history(conversation.id, question.id)?;
        let context = self
            .retrieve_context(question_text, document.as_ref())
            .await?;

        let document_context = document.as_ref().map(PromptBuilder::document_context);
        let system = PromptBuilder::build_system_prompt(
            document_context.as_deref(),
            &context,
            &PromptBuilder::render_history(&history),
        );

        let prompt = vec![ChatMessage::system(system), ChatMessage::user(question_text)];

        Ok(PreparedQuery {
            conversation,
            document,
            question,
            prompt,
        })
    }

    /// Resolve the conversation for a request, in priority order:
    /// explicit conversation id, then document binding, else `BadRequest`.
    fn resolve_conversation(
        &self,
        conversation_id: Option<Uuid>,
        document_id: Option<Uuid>,
    ) -> Result<(Conversation, Option<Document>)> {
        if let Some(id) = conversation_id {
            let conversation = self.conversations.get_conversation(id)?;
            let document = match conversation.document_id {
                Some(doc_id) => Some(self.documents.get_active(doc_id)?),
                None => None,
            };
            return Ok((conversation, document));
        }

        if let Some(doc_id) = document_id {
            let document = self.documents.get_active(doc_id)?;
            let conversation = self.conversation_for_document(&document)?;
            return Ok((conversation, Some(document)));
        }

        Err(Error::bad_request(
            "Either conversationId or documentId must be provided",
        ))
    }

    /// Get or create the active conversation bound to a document. A new
    /// conversation is seeded with one SYSTEM message carrying the
    /// document's metadata. The upload pipeline shares this logic.
    pub fn conversation_for_document(&self, document: &Document) -> Result<Conversation> {
        if let Some(existing) = self.conversations.find_active_by_document(document.id)? {
            return Ok(existing);
        }

        let conversation = self.conversations.create_conversation(
            &PromptBuilder::conversation_title(document),
            Some(document.id),
        )?;
        self.conversations.create_message(
            conversation.id,
            MessageRole::System,
            &PromptBuilder::seed_message(document),
            None,
        )?;

        tracing::info!(
            "Created conversation {} for document {}",
            conversation.id,
            document.id
        );
        Ok(conversation)
    }

    /// Last `HISTORY_WINDOW` messages, excluding the just-persisted question
    /// and all system messages.
    fn load_history(&self, conversation_id: Uuid, exclude: Uuid) -> Result<Vec<Message>> {
        let messages = self.conversations.list_messages(conversation_id)?;
        let mut history: Vec<Message> = messages
            .into_iter()
            .filter(|m| m.id != exclude && m.role != MessageRole::System)
            .collect();
        if history.len() > HISTORY_WINDOW {
            history.drain(..history.len() - HISTORY_WINDOW);
        }
        Ok(history)
    }

    /// Embed the question and collect nearest-neighbor text fragments,
    /// scoped to the bound document's vectors when one is present. The
    /// vector filter is the sole isolation mechanism between documents.
    async fn retrieve_context(
        &self,
        question: &str,
        document: Option<&Document>,
    ) -> Result<String> {
        let embedding = self.embedding.embed(question).await?;
        let filter = document.map(|d| d.vector_id.as_str());

        let matches = self
            .vector_index
            .query(&embedding, self.retrieval.top_k, filter)
            .await?;

        let fragments: Vec<&str> = matches
            .iter()
            .filter(|m| m.score >= self.retrieval.min_score)
            .filter_map(|m| m.text())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(fragments.join("\n\n"))
    }

    /// Record the assistant answer parent-linked to its question, then bump
    /// the conversation's activity timestamp.
    fn persist_answer(
        &self,
        conversation: &Conversation,
        question: &Message,
        answer: &str,
    ) -> Result<()> {
        self.conversations.create_message(
            conversation.id,
            MessageRole::Assistant,
            answer,
            Some(question.id),
        )?;
        self.conversations.touch(conversation.id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Db, NewDocument};
    use crate::test_support::{StubChat, StubEmbedder, StubVectorIndex};
    use serde_json::{json, Map};

    struct Fixture {
        engine: QaEngine,
        documents: DocumentStore,
        conversations: ConversationStore,
        chat: Arc<StubChat>,
        index: Arc<StubVectorIndex>,
    }

    fn fixture_with_chat(chat: StubChat) -> Fixture {
        let db = Db::in_memory().unwrap();
        let documents = DocumentStore::new(db.clone());
        let conversations = ConversationStore::new(db);
        let chat = Arc::new(chat);
        let index = Arc::new(StubVectorIndex::new());

        let engine = QaEngine::new(
            documents.clone(),
            conversations.clone(),
            Arc::new(StubEmbedder),
            chat.clone(),
            index.clone(),
            RetrievalConfig::default(),
        );

        Fixture {
            engine,
            documents,
            conversations,
            chat,
            index,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_chat(StubChat::new("The report covers third-quarter revenue."))
    }

    fn seed_document(fx: &Fixture, name: &str) -> Document {
        fx.documents
            .create(NewDocument {
                filename: format!("{}-1700000000000", name),
                original_name: name.to_string(),
                mime_type: "application/pdf".to_string(),
                title: Some("Quarterly Report".to_string()),
                summary: Some("Revenue summary.".to_string()),
                keywords: vec!["finance".to_string()],
                vector_id: format!("{}-1700000000000", name),
                extracted_text: Some("Revenue grew 12%.".to_string()),
            })
            .unwrap()
    }

    fn index_fragment(fx: &Fixture, vector_id: &str, text: &str) {
        let mut metadata = Map::new();
        metadata.insert("document_id".to_string(), json!(vector_id));
        metadata.insert("text".to_string(), json!(text));
        fx.index.records.lock().push(crate::providers::VectorRecord {
            id: vector_id.to_string(),
            values: vec![0.1; 8],
            metadata,
        });
    }

    fn request(document_id: Option<Uuid>, conversation_id: Option<Uuid>) -> QueryRequest {
        QueryRequest {
            question: "What is this about?".to_string(),
            conversation_id,
            document_id,
        }
    }

    #[tokio::test]
    async fn document_resolution_creates_then_reuses_conversation() {
        let fx = fixture();
        let doc = seed_document(&fx, "report.pdf");

        let first = fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();
        let second = fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();

        assert_eq!(first.conversation_id, second.conversation_id);
        assert_eq!(first.document_id, Some(doc.id));

        // Exactly one seed system message, created before any question
        let (system, pairs) = fx.conversations.qa_pairs(first.conversation_id).unwrap();
        assert_eq!(system.len(), 1);
        assert!(system[0].content.contains("Quarterly Report"));
        assert_eq!(pairs.len(), 2);
    }

    #[tokio::test]
    async fn answer_is_parent_linked_to_question() {
        let fx = fixture();
        let doc = seed_document(&fx, "report.pdf");

        fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();

        let conversation = fx
            .conversations
            .find_active_by_document(doc.id)
            .unwrap()
            .unwrap();
        let (_, pairs) = fx.conversations.qa_pairs(conversation.id).unwrap();
        assert_eq!(pairs.len(), 1);
        let answer = pairs[0].answer.as_ref().expect("answer persisted");
        assert_eq!(answer.parent_id, Some(pairs[0].question.id));
        assert_eq!(answer.content, "The report covers third-quarter revenue.");
    }

    #[tokio::test]
    async fn missing_identifiers_is_bad_request() {
        let fx = fixture();
        let err = fx.engine.answer_question(&request(None, None)).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn unknown_conversation_is_not_found() {
        let fx = fixture();
        let err = fx
            .engine
            .answer_question(&request(None, Some(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let fx = fixture();
        let err = fx
            .engine
            .answer_question(&request(Some(Uuid::new_v4()), None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn history_window_is_bounded_and_system_free() {
        let fx = fixture();
        let doc = seed_document(&fx, "report.pdf");

        // Seven exchanges leave 14 non-system messages in the thread
        for _ in 0..7 {
            fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();
        }
        fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();

        let prompt = fx.chat.last_system_prompt().unwrap();
        let user_lines = prompt.matches("USER:").count();
        let assistant_lines = prompt.matches("ASSISTANT:").count();
        assert_eq!(user_lines + assistant_lines, HISTORY_WINDOW);
        assert!(!prompt.contains("SYSTEM:"));
    }

    #[tokio::test]
    async fn retrieval_is_scoped_by_document_filter() {
        let fx = fixture();
        let doc = seed_document(&fx, "report.pdf");
        index_fragment(&fx, &doc.vector_id, "matching fragment about revenue");
        index_fragment(&fx, "other-doc-42", "unrelated fragment about penguins");

        fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();

        let prompt = fx.chat.last_system_prompt().unwrap();
        assert!(prompt.contains("matching fragment about revenue"));
        assert!(!prompt.contains("penguins"));
    }

    #[tokio::test]
    async fn empty_retrieval_still_sends_the_prompt() {
        let fx = fixture();
        let doc = seed_document(&fx, "report.pdf");

        let response = fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();
        assert!(!response.answer.is_empty());

        let prompt = fx.chat.last_system_prompt().unwrap();
        assert!(prompt.contains("No specific relevant content found."));
    }

    #[tokio::test]
    async fn stream_concatenation_matches_batch_answer() {
        let fx = fixture();
        let doc_a = seed_document(&fx, "a.pdf");
        let doc_b = seed_document(&fx, "b.pdf");

        let batch = fx.engine.answer_question(&request(Some(doc_a.id), None)).await.unwrap();

        let mut stream = fx
            .engine
            .answer_question_stream(&request(Some(doc_b.id), None))
            .await
            .unwrap();

        let mut streamed = String::new();
        let mut done = None;
        while let Some(event) = stream.next().await {
            match event {
                AnswerEvent::Delta(fragment) => streamed.push_str(&fragment),
                AnswerEvent::Done(response) => done = Some(response),
                AnswerEvent::Error(message) => panic!("unexpected error event: {}", message),
            }
        }

        assert_eq!(streamed, batch.answer);
        let done = done.expect("terminal event");
        assert_eq!(done.answer, streamed);

        // The streamed answer was persisted with its parent link
        let (_, pairs) = fx.conversations.qa_pairs(done.conversation_id).unwrap();
        assert_eq!(pairs.len(), 1);
        let answer = pairs[0].answer.as_ref().unwrap();
        assert_eq!(answer.parent_id, Some(pairs[0].question.id));
    }

    #[tokio::test]
    async fn stream_setup_failures_are_typed() {
        let fx = fixture();
        let err = fx
            .engine
            .answer_question_stream(&request(None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn mid_stream_failure_surfaces_in_band_and_skips_persistence() {
        let fx = fixture_with_chat(StubChat::failing_stream("partial answer text"));
        let doc = seed_document(&fx, "report.pdf");

        let mut stream = fx
            .engine
            .answer_question_stream(&request(Some(doc.id), None))
            .await
            .unwrap();

        let mut saw_error = false;
        let mut saw_done = false;
        while let Some(event) = stream.next().await {
            match event {
                AnswerEvent::Error(_) => saw_error = true,
                AnswerEvent::Done(_) => saw_done = true,
                AnswerEvent::Delta(_) => {}
            }
        }
        assert!(saw_error);
        assert!(!saw_done);

        let conversation = fx
            .conversations
            .find_active_by_document(doc.id)
            .unwrap()
            .unwrap();
        let (_, pairs) = fx.conversations.qa_pairs(conversation.id).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].answer.is_none());
    }

    #[tokio::test]
    async fn dropped_consumer_discards_partial_answer() {
        // An answer long enough that the producer is still streaming when
        // the consumer hangs up (fragment count well past the buffer cap)
        let fx = fixture_with_chat(StubChat::new(&"All work and no play. ".repeat(40)));
        let doc = seed_document(&fx, "report.pdf");

        let mut stream = fx
            .engine
            .answer_question_stream(&request(Some(doc.id), None))
            .await
            .unwrap();

        // Take one fragment, then hang up
        let first = stream.next().await;
        assert!(matches!(first, Some(AnswerEvent::Delta(_))));
        drop(stream);

        // Let the producer task observe the closed channel
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let conversation = fx
            .conversations
            .find_active_by_document(doc.id)
            .unwrap()
            .unwrap();
        let (_, pairs) = fx.conversations.qa_pairs(conversation.id).unwrap();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].answer.is_none(), "partial answer must not be persisted");
    }

    #[tokio::test]
    async fn exchange_touches_conversation_timestamp() {
        let fx = fixture();
        let doc = seed_document(&fx, "report.pdf");

        let response = fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();
        let before = fx.conversations.get_conversation(response.conversation_id).unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        fx.engine.answer_question(&request(Some(doc.id), None)).await.unwrap();

        let after = fx.conversations.get_conversation(response.conversation_id).unwrap();
        assert!(after.updated_at > before.updated_at);
    }
}
