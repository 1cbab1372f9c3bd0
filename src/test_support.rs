//! Deterministic gateway stubs for unit tests

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::providers::{
    ChatMessage, ChatProvider, Completion, EmbeddingProvider, TokenStream, VectorIndexProvider,
    VectorMatch, VectorRecord, DOCUMENT_FILTER_KEY,
};

/// Embedder returning a fixed small vector
pub struct StubEmbedder;

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.1; 8])
    }

    fn dimensions(&self) -> usize {
        8
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stub-embedder"
    }
}

/// Chat provider with a fixed reply, recording every prompt it receives.
///
/// The streaming path yields the reply in fixed-size fragments whose
/// concatenation equals the batch reply.
pub struct StubChat {
    reply: String,
    fail_stream: bool,
    pub calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl StubChat {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail_stream: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A stub whose stream yields one fragment and then an in-band error
    pub fn failing_stream(reply: &str) -> Self {
        Self {
            fail_stream: true,
            ..Self::new(reply)
        }
    }

    fn fragments(&self) -> Vec<String> {
        self.reply
            .chars()
            .collect::<Vec<_>>()
            .chunks(4)
            .map(|c| c.iter().collect())
            .collect()
    }

    /// The system prompt of the most recent call
    pub fn last_system_prompt(&self) -> Option<String> {
        self.calls
            .lock()
            .last()
            .and_then(|messages| messages.first())
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl ChatProvider for StubChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        self.calls.lock().push(messages.to_vec());
        Ok(Completion {
            content: self.reply.clone(),
            tokens_used: 42,
        })
    }

    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        self.calls.lock().push(messages.to_vec());

        if self.fail_stream {
            let first = self.fragments().into_iter().next().unwrap_or_default();
            let items = vec![Ok(first), Err(Error::upstream("model connection lost"))];
            return Ok(stream::iter(items).boxed());
        }

        let items: Vec<Result<String>> = self.fragments().into_iter().map(Ok).collect();
        Ok(stream::iter(items).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stub-chat"
    }
}

/// In-memory vector index honoring the document filter key
#[derive(Default)]
pub struct StubVectorIndex {
    pub records: Mutex<Vec<VectorRecord>>,
}

impl StubVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndexProvider for StubVectorIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        self.records.lock().extend(records.iter().cloned());
        Ok(())
    }

    async fn query(
        &self,
        _vector: &[f32],
        top_k: usize,
        document_filter: Option<&str>,
    ) -> Result<Vec<VectorMatch>> {
        let records = self.records.lock();
        let matches = records
            .iter()
            .filter(|r| match document_filter {
                Some(filter) => r
                    .metadata
                    .get(DOCUMENT_FILTER_KEY)
                    .and_then(|v| v.as_str())
                    .map(|v| v == filter)
                    .unwrap_or(false),
                None => true,
            })
            .take(top_k)
            .map(|r| VectorMatch {
                id: r.id.clone(),
                score: 0.9,
                metadata: r.metadata.clone(),
            })
            .collect();
        Ok(matches)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stub-index"
    }
}
