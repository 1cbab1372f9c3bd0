//! paperchat: document Q&A with conversational memory
//!
//! Upload files, derive structured metadata and an embedding, and answer
//! follow-up questions with retrieval-augmented generation over a
//! persistent conversation thread. Answers are parent-linked to the
//! questions that triggered them, so threads reconstruct into exact
//! question/answer pairs.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod qa;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
pub mod test_support;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use qa::{AnswerEvent, QaEngine};
pub use types::{
    conversation::{Conversation, Message, MessageRole, QaPair},
    document::{Document, DocumentStructure},
    query::QueryRequest,
    response::{QueryResponse, UploadResponse},
};
