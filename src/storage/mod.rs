//! Persistent storage for documents, conversations, and messages

pub mod conversations;
pub mod database;
pub mod documents;

pub use conversations::ConversationStore;
pub use database::Db;
pub use documents::{DocumentStore, NewDocument};
