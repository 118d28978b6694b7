//! Streaming chat endpoint

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;

use crate::server::state::AppState;
use crate::types::ChatRequest;

/// POST /api/chat - stream the growing answer as Server-Sent Events.
///
/// Every `message` event carries `{"text": ...}` with the full response so far.
/// Payloads are JSON so model output with line breaks stays one SSE field.
/// A failed turn ends with one `error` event holding the message and the
/// partial text; a finished turn ends with `done`.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(
        "Chat: \"{}\" ({} history entries)",
        request.message,
        request.history.len()
    );

    let mut responses = state.service().respond(request);

    let events = async_stream::stream! {
        let mut failed = false;

        while let Some(item) = responses.next().await {
            match item {
                Ok(text) => {
                    let payload = serde_json::json!({ "text": text });
                    yield Ok(Event::default().event("message").data(payload.to_string()));
                }
                Err(e) => {
                    tracing::warn!("Chat turn failed: {}", e);
                    let payload = serde_json::json!({
                        "message": e.to_string(),
                        "partial": e.partial_response().unwrap_or_default(),
                    });
                    yield Ok(Event::default().event("error").data(payload.to_string()));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            yield Ok(Event::default().event("done").data("[DONE]"));
        }
    };

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
