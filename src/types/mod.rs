//! Core types for the document Q&A service

pub mod conversation;
pub mod document;
pub mod query;
pub mod response;

pub use conversation::{Conversation, Message, MessageRole, QaPair};
pub use document::{Document, DocumentStructure, StructuredSection};
pub use query::{DocumentSearchParams, QueryRequest, SortField, SortOrder};
pub use response::{QueryResponse, UploadResponse};

/// Truncate a string to at most `max_chars` characters, appending an ellipsis
/// when anything was cut. Works on character boundaries, not bytes.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        // Multibyte characters must not be split
        assert_eq!(truncate_chars("héllo wörld", 6), "héllo ...");
    }
}
