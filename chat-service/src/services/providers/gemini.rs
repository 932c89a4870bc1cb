//! Gemini AI provider implementation.
//!
//! Implements text generation and multi-turn chat against Google's Gemini
//! REST API. Supports both streaming and non-streaming responses.

use super::{
    ChatOptions, ChatSession, ProviderError, ProviderStream, TextChunk, TextCompletion,
    TextProvider,
};
use crate::models::{ChatTurn, Usage};
use crate::services::metrics;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Finish reasons that mean the reply was withheld.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Secret<String>,
    /// API root, e.g. https://generativelanguage.googleapis.com/v1beta
    pub api_base: String,
    pub model: String,
}

/// Gemini text and chat provider.
pub struct GeminiTextProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiTextProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Build the API URL for the given model and method.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.model,
            method,
            self.config.api_key.expose_secret()
        )
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ));
        }
        Ok(())
    }

    fn build_request(
        contents: Vec<ChatTurn>,
        options: Option<ChatOptions>,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            contents,
            generation_config: options.map(|o| GenerationConfig {
                temperature: Some(o.temperature),
                max_output_tokens: Some(o.max_output_tokens),
            }),
        }
    }

    async fn post(&self, method: &str, request: &GenerateContentRequest) -> Result<Response, ProviderError> {
        self.ensure_configured()?;

        let url = match method {
            "streamGenerateContent" => format!("{}&alt=sse", self.api_url(method)),
            _ => self.api_url(method),
        };

        tracing::debug!(
            model = %self.config.model,
            turns = request.contents.len(),
            method,
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status,
                api_error_message(&error_text)
            )));
        }

        Ok(response)
    }

    async fn complete(
        &self,
        operation: &'static str,
        request: GenerateContentRequest,
    ) -> Result<TextCompletion, ProviderError> {
        let start = Instant::now();
        let result = async {
            let response = self.post("generateContent", &request).await?;
            let api_response: GenerateContentResponse = response.json().await.map_err(|e| {
                ProviderError::ApiError(format!("Failed to parse response: {}", e))
            })?;
            api_response.into_completion()
        }
        .await;

        metrics::record_provider_call("gemini", operation, result.is_ok(), start.elapsed());
        if let Ok(completion) = &result {
            if let Some(usage) = &completion.usage {
                metrics::record_tokens(&self.config.model, usage);
            }
        }

        result
    }

    async fn stream(&self, request: GenerateContentRequest) -> Result<ProviderStream, ProviderError> {
        let response = self.post("streamGenerateContent", &request).await?;

        let (tx, rx) = mpsc::channel(32);

        // Spawn task to process SSE stream
        tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            // Raw bytes: a multi-byte character may straddle two network chunks
            let mut buffer: Vec<u8> = Vec::new();
            let mut usage = None;

            while let Some(chunk_result) = stream.next().await {
                let chunk = match chunk_result {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::NetworkError(e.without_url().to_string())))
                            .await;
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);

                while let Some(event) = next_sse_event(&mut buffer) {
                    let Some(item) = decode_event(&event, &mut usage) else {
                        continue;
                    };
                    let failed = item.is_err();

                    if tx.send(item).await.is_err() || failed {
                        return;
                    }
                }
            }

            // The last event may arrive without its closing blank line
            if let Some(event) = trailing_sse_event(&mut buffer) {
                if let Some(item) = decode_event(&event, &mut usage) {
                    let failed = item.is_err();
                    if tx.send(item).await.is_err() || failed {
                        return;
                    }
                }
            }

            let _ = tx.send(Ok(TextChunk::Done { usage })).await;
        });

        Ok(Box::pin(ReceiverStream::new(rx)) as ProviderStream)
    }
}

#[async_trait]
impl TextProvider for GeminiTextProvider {
    async fn generate(&self, prompt: &str) -> Result<TextCompletion, ProviderError> {
        let request = Self::build_request(vec![ChatTurn::user(prompt)], None);
        self.complete("generate", request).await
    }

    async fn generate_stream(&self, prompt: &str) -> Result<ProviderStream, ProviderError> {
        let request = Self::build_request(vec![ChatTurn::user(prompt)], None);
        self.stream(request).await
    }

    async fn send_message(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<TextCompletion, ProviderError> {
        let request =
            Self::build_request(session.contents_with(message), Some(session.options()));
        let completion = self.complete("chat", request).await?;
        session.record_exchange(message, &completion.text);
        Ok(completion)
    }

    async fn send_message_stream(
        &self,
        session: &ChatSession,
        message: &str,
    ) -> Result<ProviderStream, ProviderError> {
        let request =
            Self::build_request(session.contents_with(message), Some(session.options()));
        self.stream(request).await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.ensure_configured()?;

        // Listing models verifies the API key
        let url = format!(
            "{}/models?key={}",
            self.config.api_base.trim_end_matches('/'),
            self.config.api_key.expose_secret()
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::ApiError(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Pop the next complete server-sent event off `buffer`. Events end with a
/// blank line; both `\n\n` and `\r\n\r\n` separators occur in practice.
/// Only whole events are decoded, so UTF-8 sequences are never cut.
fn next_sse_event(buffer: &mut Vec<u8>) -> Option<String> {
    let lf = find_bytes(buffer, b"\n\n").map(|i| (i, 2));
    let crlf = find_bytes(buffer, b"\r\n\r\n").map(|i| (i, 4));

    let (end, sep_len) = match (lf, crlf) {
        (Some(a), Some(b)) => {
            if a.0 <= b.0 {
                a
            } else {
                b
            }
        }
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };

    let event: Vec<u8> = buffer.drain(..end + sep_len).take(end).collect();
    Some(String::from_utf8_lossy(&event).into_owned())
}

/// Whatever is left once the body has ended, if it is more than whitespace.
fn trailing_sse_event(buffer: &mut Vec<u8>) -> Option<String> {
    let rest = String::from_utf8_lossy(buffer).trim().to_string();
    buffer.clear();
    (!rest.is_empty()).then_some(rest)
}

/// Turn one event into a stream item. Keep-alives, unparseable events and
/// empty text yield nothing; usage metadata is remembered for the final chunk.
fn decode_event(
    event: &str,
    usage: &mut Option<Usage>,
) -> Option<Result<TextChunk, ProviderError>> {
    let data = sse_data(event)?;
    let Ok(response) = serde_json::from_str::<GenerateContentResponse>(&data) else {
        tracing::warn!("Skipping unparseable Gemini stream event");
        return None;
    };

    if response.usage_metadata.is_some() {
        *usage = response.usage_metadata.clone();
    }

    match response.into_completion() {
        Ok(completion) if completion.text.is_empty() => None,
        Ok(completion) => Some(Ok(TextChunk::Text(completion.text))),
        Err(e) => Some(Err(e)),
    }
}

/// Concatenate the `data:` lines of one event.
fn sse_data(event: &str) -> Option<String> {
    let lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Pull `error.message` out of a Google error body, else return it as is.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<Usage>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, all parts joined, or the reason it was
    /// withheld.
    fn into_completion(self) -> Result<TextCompletion, ProviderError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
                return Err(ProviderError::ContentFiltered(format!(
                    "Prompt blocked: {}",
                    reason
                )));
            }
            return Ok(TextCompletion {
                text: String::new(),
                usage: self.usage_metadata,
            });
        };

        if let Some(reason) = candidate.finish_reason.as_deref() {
            if BLOCKED_FINISH_REASONS.contains(&reason) {
                return Err(ProviderError::ContentFiltered(format!(
                    "Response blocked: {}",
                    reason
                )));
            }
        }

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(TextCompletion {
            text,
            usage: self.usage_metadata,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_events_on_either_separator() {
        let mut buffer = b"data: one\n\ndata: two\r\n\r\ndata: thr".to_vec();

        assert_eq!(next_sse_event(&mut buffer).as_deref(), Some("data: one"));
        assert_eq!(next_sse_event(&mut buffer).as_deref(), Some("data: two"));
        assert_eq!(next_sse_event(&mut buffer), None);
        assert_eq!(buffer, b"data: thr");
    }

    #[test]
    fn hangul_split_across_chunks_survives() {
        let event = "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"안녕\"}]}}]}\n\n";
        let bytes = event.as_bytes();
        // One byte into the first syllable
        let split = event.find('안').unwrap() + 1;

        let mut buffer = bytes[..split].to_vec();
        assert_eq!(next_sse_event(&mut buffer), None);
        buffer.extend_from_slice(&bytes[split..]);

        let event = next_sse_event(&mut buffer).unwrap();
        let mut usage = None;
        match decode_event(&event, &mut usage) {
            Some(Ok(TextChunk::Text(text))) => assert_eq!(text, "안녕"),
            other => panic!("unexpected item: {:?}", other),
        }
    }

    #[test]
    fn trailing_event_without_blank_line_is_kept() {
        let mut buffer = b"data: {\"usageMetadata\":{\"totalTokenCount\":3}}\r\n".to_vec();
        assert_eq!(next_sse_event(&mut buffer), None);

        let event = trailing_sse_event(&mut buffer).unwrap();
        assert!(buffer.is_empty());

        let mut usage = None;
        assert!(decode_event(&event, &mut usage).is_none());
        assert_eq!(usage.and_then(|u| u.total_token_count), Some(3));

        assert_eq!(trailing_sse_event(&mut b" \r\n".to_vec()), None);
    }

    #[test]
    fn joins_multiline_data() {
        assert_eq!(sse_data("data: {\"a\":\ndata: 1}").as_deref(), Some("{\"a\":\n1}"));
        assert_eq!(sse_data(": keep-alive"), None);
    }

    #[test]
    fn completion_joins_all_text_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Hello, "}, {"text": "world"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
        }))
        .unwrap();

        let completion = response.into_completion().unwrap();
        assert_eq!(completion.text, "Hello, world");
        assert_eq!(completion.usage, Some(Usage::new(3, 2)));
    }

    #[test]
    fn safety_finish_reason_is_content_filtered() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();

        assert!(matches!(
            response.into_completion(),
            Err(ProviderError::ContentFiltered(_))
        ));
    }

    #[test]
    fn blocked_prompt_is_content_filtered() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "OTHER"}
        }))
        .unwrap();

        let err = response.into_completion().unwrap_err();
        assert!(err.to_string().contains("OTHER"));
    }

    #[test]
    fn extracts_google_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(api_error_message(body), "API key not valid.");
        assert_eq!(api_error_message("upstream down"), "upstream down");
    }
}
