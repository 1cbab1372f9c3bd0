//! Document endpoints: upload, listing, and the grouped conversation view

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::query::DocumentSearchParams;
use crate::types::response::{
    ConversationMessagesResponse, DocumentRef, DocumentWithConversation, DocumentsResponse,
    UploadResponse,
};

/// POST /api/documents/upload - Upload one file for processing
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::bad_request(format!("Failed to read multipart field: {}", e)))?
    {
        // The upload is the first field carrying a filename
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);

        let data: bytes::Bytes = field
            .bytes()
            .await
            .map_err(|e| Error::bad_request(format!("Failed to read file: {}", e)))?;

        let response = state
            .upload()
            .upload_document(&data, &filename, content_type.as_deref())
            .await?;
        return Ok(Json(response));
    }

    Err(Error::bad_request("No file field in multipart body"))
}

/// GET /api/documents - List documents with keyword filter and sorting
pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<DocumentSearchParams>,
) -> Result<Json<DocumentsResponse>> {
    let documents = state.documents().search(&params)?;

    let mut decorated = Vec::with_capacity(documents.len());
    for document in documents {
        let conversation = match state.conversations().find_active_by_document(document.id)? {
            Some(conversation) => Some(state.conversations().summary(&conversation)?),
            None => None,
        };
        decorated.push(DocumentWithConversation {
            document,
            conversation,
        });
    }

    let total = decorated.len();
    Ok(Json(DocumentsResponse {
        documents: decorated,
        total,
        search_keyword: params.keyword,
    }))
}

/// GET /api/documents/conversations/:id/messages - Grouped Q&A view
pub async fn conversation_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationMessagesResponse>> {
    let conversation = state.conversations().get_conversation(conversation_id)?;
    let (system_messages, question_answer_pairs) =
        state.conversations().qa_pairs(conversation_id)?;

    // The view tolerates a deactivated document; the header just omits it
    let document = match conversation.document_id {
        Some(document_id) => match state.documents().get_active(document_id) {
            Ok(doc) => Some(DocumentRef::from(&doc)),
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        },
        None => None,
    };

    let message_count = state.conversations().list_messages(conversation_id)?.len();

    Ok(Json(ConversationMessagesResponse {
        conversation_id: conversation.id,
        title: conversation.title,
        document_id: conversation.document_id,
        document,
        message_count,
        system_messages,
        question_answer_pairs,
        created_at: conversation.created_at,
        updated_at: conversation.updated_at,
    }))
}
