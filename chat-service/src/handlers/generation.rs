//! Task-specific generation routes built on prompt templates.

use axum::{extract::State, Json};
use axum_extra::extract::WithRejection;
use service_core::error::AppError;

use super::{required, ApiJson};
use crate::dtos::{
    AnswerRequest, AnswerResponse, GenerateCodeRequest, GenerateCodeResponse, ReviewCodeRequest,
    ReviewCodeResponse, SummarizeRequest, SummarizeResponse, TranslateRequest, TranslateResponse,
};
use crate::services::prompts::{self, DEFAULT_LANGUAGE, DEFAULT_SUMMARY_LENGTH};
use crate::services::providers::TextCompletion;
use crate::startup::AppState;

async fn complete(state: &AppState, prompt: &str, failure: &str) -> Result<TextCompletion, AppError> {
    state
        .text_provider
        .generate(prompt)
        .await
        .map_err(|e| AppError::upstream(failure, e))
}

#[tracing::instrument(skip_all)]
pub async fn generate_code(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<GenerateCodeRequest>,
) -> Result<Json<GenerateCodeResponse>, AppError> {
    let prompt = required(request.prompt, "Prompt is required.")?;
    let language = request.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    tracing::debug!(language = %language, "Generating code");
    let completion = complete(
        &state,
        &prompts::code_generation(&prompt, &language),
        "Failed to generate code",
    )
    .await?;

    Ok(Json(GenerateCodeResponse {
        success: true,
        code: completion.text,
        usage: completion.usage,
    }))
}

#[tracing::instrument(skip_all)]
pub async fn review_code(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<ReviewCodeRequest>,
) -> Result<Json<ReviewCodeResponse>, AppError> {
    let code = required(request.code, "Code is required.")?;
    let language = request.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let completion = complete(
        &state,
        &prompts::code_review(&code, &language),
        "Failed to review code",
    )
    .await?;

    Ok(Json(ReviewCodeResponse {
        success: true,
        review: completion.text,
        usage: completion.usage,
    }))
}

#[tracing::instrument(skip_all)]
pub async fn summarize(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let text = required(request.text, "Text is required.")?;
    let max_length = request.max_length.unwrap_or(DEFAULT_SUMMARY_LENGTH);

    let completion = complete(
        &state,
        &prompts::summary(&text, max_length),
        "Failed to summarize text",
    )
    .await?;

    Ok(Json(SummarizeResponse {
        success: true,
        summary: completion.text,
        usage: completion.usage,
    }))
}

#[tracing::instrument(skip_all)]
pub async fn translate(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<TranslateRequest>,
) -> Result<Json<TranslateResponse>, AppError> {
    let text = required(request.text, "Text is required.")?;
    let target = required(request.target_language, "Target language is required.")?;

    let completion = complete(
        &state,
        &prompts::translation(&text, &target),
        "Failed to translate text",
    )
    .await?;

    Ok(Json(TranslateResponse {
        success: true,
        translation: completion.text,
        usage: completion.usage,
    }))
}

#[tracing::instrument(skip_all)]
pub async fn answer(
    State(state): State<AppState>,
    WithRejection(Json(request), _): ApiJson<AnswerRequest>,
) -> Result<Json<AnswerResponse>, AppError> {
    let question = required(request.question, "Question is required.")?;
    let context = request.context.unwrap_or_default();

    let completion = complete(
        &state,
        &prompts::question(&question, &context),
        "Failed to answer question",
    )
    .await?;

    Ok(Json(AnswerResponse {
        success: true,
        answer: completion.text,
        usage: completion.usage,
    }))
}
