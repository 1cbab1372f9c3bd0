//! Query endpoints: batch answers and the SSE token stream

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use serde_json::json;
use std::convert::Infallible;

use crate::error::Result;
use crate::qa::AnswerEvent;
use crate::server::state::AppState;
use crate::types::response::QueryResponse;
use crate::types::QueryRequest;

/// POST /api/documents/query - Answer a question in one response
pub async fn query_documents(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    tracing::info!("Query: \"{}\"", crate::types::truncate_chars(&request.question, 80));

    let response = state.qa().answer_question(&request).await?;
    Ok(Json(response))
}

/// POST /api/documents/query/stream - Answer a question as an SSE stream
///
/// Fragments arrive as `data: {"content": ...}` events; a generation
/// failure is surfaced in-band as `data: {"error": ...}`; the stream is
/// terminated by a literal `data: [DONE]` event. Failures before the first
/// token (unknown conversation, missing identifiers) are plain HTTP errors.
pub async fn query_documents_stream(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    tracing::info!(
        "Streaming query: \"{}\"",
        crate::types::truncate_chars(&request.question, 80)
    );

    let events = state.qa().answer_question_stream(&request).await?;

    let sse_stream = events.map(|event| {
        let event = match event {
            AnswerEvent::Delta(content) => {
                Event::default().data(json!({ "content": content }).to_string())
            }
            AnswerEvent::Error(message) => {
                Event::default().data(json!({ "error": message }).to_string())
            }
            AnswerEvent::Done(_) => Event::default().data("[DONE]"),
        };
        Ok(event)
    });

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::default()))
}
