//! Gemini client tests against a local mock of the REST API.

use chat_service::models::ChatTurn;
use chat_service::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use chat_service::services::providers::{ChatOptions, ProviderError, TextChunk, TextProvider};
use futures::StreamExt;
use secrecy::Secret;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.0-flash";

fn provider(server: &MockServer, api_key: &str) -> GeminiTextProvider {
    GeminiTextProvider::new(GeminiConfig {
        api_key: Secret::new(api_key.to_string()),
        api_base: server.uri(),
        model: MODEL.to_string(),
    })
    .unwrap()
}

fn reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 6, "totalTokenCount": 10}
    })
}

#[tokio::test]
async fn generate_posts_prompt_and_reads_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", MODEL)))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Hello"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Hi!")))
        .expect(1)
        .mount(&server)
        .await;

    let completion = provider(&server, "test-key").generate("Hello").await.unwrap();

    assert_eq!(completion.text, "Hi!");
    let usage = completion.usage.unwrap();
    assert_eq!(usage.prompt_token_count, Some(4));
    assert_eq!(usage.candidates_token_count, Some(6));
}

#[tokio::test]
async fn chat_sends_history_and_generation_config() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}:generateContent", MODEL)))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "hello"}]},
                {"role": "model", "parts": [{"text": "hi"}]},
                {"role": "user", "parts": [{"text": "how are you?"}]}
            ],
            "generationConfig": {"maxOutputTokens": 2048, "temperature": 0.7}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Fine.")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server, "test-key");
    let mut session = provider
        .start_chat(
            vec![ChatTurn::user("hello"), ChatTurn::model("hi")],
            ChatOptions::default(),
        )
        .await
        .unwrap();

    let completion = provider
        .send_message(&mut session, "how are you?")
        .await
        .unwrap();

    assert_eq!(completion.text, "Fine.");
    assert_eq!(session.history().len(), 4);
}

#[tokio::test]
async fn rate_limit_is_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = provider(&server, "test-key").generate("x").await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));
}

#[tokio::test]
async fn api_error_message_is_extracted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server, "bad-key").generate("x").await.unwrap_err();
    match err {
        ProviderError::ApiError(message) => {
            assert!(message.contains("API key not valid."));
            assert!(!message.contains("bad-key"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn blocked_prompt_is_content_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        })))
        .mount(&server)
        .await;

    let err = provider(&server, "test-key").generate("x").await.unwrap_err();
    assert!(matches!(err, ProviderError::ContentFiltered(_)));
}

#[tokio::test]
async fn missing_key_fails_without_calling_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("x")))
        .expect(0)
        .mount(&server)
        .await;

    let err = provider(&server, "").generate("x").await.unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}

#[tokio::test]
async fn stream_yields_chunks_then_usage() {
    let server = MockServer::start().await;
    let events = [
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "Hel"}]}}]}),
        json!({"candidates": [{"content": {"role": "model", "parts": [{"text": "lo"}]}}]}),
        reply(""),
    ];
    let body: String = events
        .iter()
        .map(|event| format!("data: {}\r\n\r\n", event))
        .collect();

    Mock::given(method("POST"))
        .and(path(format!("/models/{}:streamGenerateContent", MODEL)))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let chunks: Vec<_> = provider(&server, "test-key")
        .generate_stream("Hello")
        .await
        .unwrap()
        .collect()
        .await;

    let text: String = chunks
        .iter()
        .filter_map(|c| match c {
            Ok(TextChunk::Text(t)) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Hello");

    match chunks.last() {
        Some(Ok(TextChunk::Done { usage: Some(usage) })) => {
            assert_eq!(usage.total_token_count, Some(10));
        }
        other => panic!("unexpected final chunk: {:?}", other),
    }
}

#[tokio::test]
async fn stream_keeps_final_event_without_blank_line() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: {}",
        json!({"candidates": [{"content": {"parts": [{"text": "안녕"}]}}]}),
        json!({"candidates": [{"content": {"parts": [{"text": "하세요"}]}}],
               "usageMetadata": {"totalTokenCount": 9}})
    );

    Mock::given(method("POST"))
        .and(path(format!("/models/{}:streamGenerateContent", MODEL)))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let chunks: Vec<_> = provider(&server, "test-key")
        .generate_stream("인사")
        .await
        .unwrap()
        .collect()
        .await;

    let text: String = chunks
        .iter()
        .filter_map(|c| match c {
            Ok(TextChunk::Text(t)) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "안녕하세요");
    assert!(matches!(
        chunks.last(),
        Some(Ok(TextChunk::Done { usage: Some(u) })) if u.total_token_count == Some(9)
    ));
}

#[tokio::test]
async fn health_check_lists_models_with_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server, "test-key").health_check().await.unwrap();
}

#[tokio::test]
async fn health_check_reports_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = provider(&server, "bad-key").health_check().await.unwrap_err();
    assert!(matches!(err, ProviderError::ApiError(_)));

    let err = provider(&server, "").health_check().await.unwrap_err();
    assert!(matches!(err, ProviderError::NotConfigured(_)));
}
