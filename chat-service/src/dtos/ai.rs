//! Request and response bodies for the generative-AI routes.
//!
//! Required text fields are `Option` so a missing value reaches the handler
//! and is reported in the standard envelope instead of as a parse failure.

use crate::models::{ChatTurn, Usage};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateCodeRequest {
    pub prompt: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateCodeResponse {
    pub success: bool,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewCodeRequest {
    pub code: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewCodeResponse {
    pub success: bool,
    pub review: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeRequest {
    pub text: Option<String>,
    pub max_length: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub success: bool,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub target_language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub success: bool,
    pub translation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub success: bool,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Connectivity probe reply.
#[derive(Debug, Serialize)]
pub struct ProbeResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub payload: T,
}

/// `data:` payload of a streamed text chunk.
#[derive(Debug, Serialize)]
pub struct StreamText {
    pub text: String,
}

/// `data:` payload of the final `done` event.
#[derive(Debug, Serialize)]
pub struct StreamDone {
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}
