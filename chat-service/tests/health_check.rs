//! End-to-end test: the full application on a random port, with both remote
//! services replaced by local mock servers.

mod common;

use chat_service::startup::Application;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn spawn_app(gemini: &MockServer, supabase: &MockServer) -> u16 {
    let mut config = common::test_config();
    config.google.api_base = gemini.uri();
    config.supabase.url = supabase.uri();

    let app = Application::build(config)
        .await
        .expect("Failed to build application");
    let port = app.port();

    tokio::spawn(async move {
        let _ = app.run_until_stopped().await;
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    port
}

#[tokio::test]
async fn health_check_returns_ok() {
    let gemini = MockServer::start().await;
    let supabase = MockServer::start().await;
    let port = spawn_app(&gemini, &supabase).await;

    let response = Client::new()
        .get(format!("http://localhost:{}/health", port))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn chat_goes_through_gemini() {
    let gemini = MockServer::start().await;
    let supabase = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Hello from Gemini"}]}}],
            "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 4, "totalTokenCount": 7}
        })))
        .expect(1)
        .mount(&gemini)
        .await;

    let port = spawn_app(&gemini, &supabase).await;

    let body: Value = Client::new()
        .post(format!("http://localhost:{}/chat", port))
        .json(&json!({"message": "hi"}))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Response was not JSON");

    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Hello from Gemini");
    assert_eq!(body["usage"]["totalTokenCount"], 7);
}

#[tokio::test]
async fn supabase_probe_goes_through_postgrest() {
    let gemini = MockServer::start().await;
    let supabase = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&supabase)
        .await;

    let port = spawn_app(&gemini, &supabase).await;

    let response = Client::new()
        .get(format!("http://localhost:{}/test-supabase", port))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.expect("Response was not JSON");
    assert_eq!(body["data"], json!([{"id": 1}]));
}
