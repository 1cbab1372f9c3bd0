//! Gateway abstractions for embeddings, chat completions, and the vector index
//!
//! Trait seams keep the orchestrator independent of any concrete model or
//! index vendor; the shipped implementations speak the OpenAI and Pinecone
//! REST dialects.

pub mod chat;
pub mod embedding;
pub mod openai;
pub mod pinecone;
pub mod vector_index;

pub use chat::{ChatMessage, ChatProvider, Completion, TokenStream};
pub use embedding::EmbeddingProvider;
pub use openai::OpenAiClient;
pub use pinecone::PineconeIndex;
pub use vector_index::{VectorIndexProvider, VectorMatch, VectorRecord, DOCUMENT_FILTER_KEY};
