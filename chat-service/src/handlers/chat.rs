//! Chat and streaming routes.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use axum_extra::extract::WithRejection;
use futures::{Stream, StreamExt};
use service_core::error::{AppError, ErrorEnvelope};

use super::{required, ApiJson};
use crate::dtos::{ChatRequest, ChatResponse, GenerateRequest, StreamDone, StreamText};
use crate::services::providers::{ChatOptions, ChatSession, ProviderError, TextChunk};
use crate::startup::AppState;

async fn open_session(state: &AppState, request: ChatRequest) -> Result<(ChatSession, String), AppError> {
    let message = required(request.message, "Message is required.")?;

    let session = state
        .text_provider
        .start_chat(request.history, ChatOptions::default())
        .await
        .map_err(|e| AppError::upstream("Failed to start chat", e))?;

    Ok((session, message))
}

#[tracing::instrument(skip_all)]
pub async fn chat(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let (mut session, message) = open_session(&state, request).await?;

    let completion = state
        .text_provider
        .send_message(&mut session, &message)
        .await
        .map_err(|e| AppError::upstream("Failed to send message", e))?;

    tracing::info!(turns = session.history().len(), "Chat reply generated");

    Ok(Json(ChatResponse {
        success: true,
        response: completion.text,
        usage: completion.usage,
    }))
}

/// Same input as `/chat`, answered as server-sent events.
#[tracing::instrument(skip_all)]
pub async fn chat_stream(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let (session, message) = open_session(&state, request).await?;

    let stream = state
        .text_provider
        .send_message_stream(&session, &message)
        .await
        .map_err(|e| AppError::upstream("Failed to send message", e))?;

    Ok(Sse::new(stream.map(to_event)).keep_alive(KeepAlive::default()))
}

/// Raw prompt streamed back without chat history.
#[tracing::instrument(skip_all)]
pub async fn generate_stream(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<GenerateRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let prompt = required(request.prompt, "Prompt is required.")?;

    let stream = state
        .text_provider
        .generate_stream(&prompt)
        .await
        .map_err(|e| AppError::upstream("Failed to generate text", e))?;

    Ok(Sse::new(stream.map(to_event)).keep_alive(KeepAlive::default()))
}

/// Text chunks are unnamed events, the summary is `done`, failures `error`.
fn to_event(chunk: Result<TextChunk, ProviderError>) -> Result<Event, axum::Error> {
    match chunk {
        Ok(TextChunk::Text(text)) => Event::default().json_data(StreamText { text }),
        Ok(TextChunk::Done { usage }) => Event::default()
            .event("done")
            .json_data(StreamDone { done: true, usage }),
        Err(e) => {
            tracing::error!(error = %e, "Stream interrupted");
            Event::default().event("error").json_data(ErrorEnvelope {
                success: false,
                message: "Stream interrupted".to_string(),
                error: Some(e.to_string()),
            })
        }
    }
}
