//! API routes for the document Q&A server

pub mod documents;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Documents
        .route("/documents", get(documents::list_documents))
        .route(
            "/documents/upload",
            post(documents::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Query
        .route("/documents/query", post(query::query_documents))
        .route("/documents/query/stream", post(query::query_documents_stream))
        // Conversations
        .route(
            "/documents/conversations/:id/messages",
            get(documents::conversation_messages),
        )
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "paperchat",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document Q&A with conversational memory and retrieval-augmented answers",
        "endpoints": {
            "POST /api/documents/upload": "Upload a document (multipart)",
            "GET /api/documents": "List documents (keyword, sortBy, sortOrder)",
            "POST /api/documents/query": "Ask a question (batch answer)",
            "POST /api/documents/query/stream": "Ask a question (SSE stream, [DONE]-terminated)",
            "GET /api/documents/conversations/:id/messages": "Grouped Q&A view of a conversation"
        }
    }))
}
