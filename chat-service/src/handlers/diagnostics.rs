//! Connectivity smoke tests for the two remote services.

use axum::{extract::State, Json};
use serde_json::{json, Value};
use service_core::error::AppError;

use crate::dtos::ProbeResponse;
use crate::startup::AppState;

const GOOGLE_AI_TEST_PROMPT: &str = "Hello! This is a short test message.";

#[tracing::instrument(skip_all)]
pub async fn test_supabase(
    State(state): State<AppState>,
) -> Result<Json<ProbeResponse<Value>>, AppError> {
    let data = state
        .store
        .health_check()
        .await
        .map_err(|e| AppError::upstream("Supabase connection failed", e))?;

    Ok(Json(ProbeResponse {
        success: true,
        message: "Supabase connection succeeded!".to_string(),
        payload: json!({ "data": data }),
    }))
}

#[tracing::instrument(skip_all)]
pub async fn test_google_ai(
    State(state): State<AppState>,
) -> Result<Json<ProbeResponse<Value>>, AppError> {
    let completion = state
        .text_provider
        .generate(GOOGLE_AI_TEST_PROMPT)
        .await
        .map_err(|e| AppError::upstream("Google AI connection failed", e))?;

    Ok(Json(ProbeResponse {
        success: true,
        message: "Google AI connection succeeded!".to_string(),
        payload: json!({ "response": completion.text }),
    }))
}
