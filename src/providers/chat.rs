//! Chat-completion provider trait, batch and streaming

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::Result;
use crate::types::MessageRole;

/// One turn handed to the model
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Turn role
    pub role: MessageRole,
    /// Turn text
    pub content: String,
}

impl ChatMessage {
    /// System turn
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// User turn
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// A finished completion
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text
    pub content: String,
    /// Total tokens billed for the call
    pub tokens_used: u32,
}

/// Ordered text fragments; the stream ends after the final fragment, and
/// generation failures arrive in-band as `Err` items.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Trait for chat-based text generation
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate a full completion for the given turns
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion>;

    /// Generate a completion as a lazy fragment stream. Restartable per
    /// call, not resumable mid-stream; dropping the stream releases the
    /// underlying connection.
    async fn complete_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
