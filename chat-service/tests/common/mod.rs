#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chat_service::config::{ChatConfig, CorsConfig, GoogleConfig, SupabaseConfig};
use chat_service::services::providers::mock::MockTextProvider;
use chat_service::services::MockDataStore;
use chat_service::startup::build_router;
use chat_service::AppState;
use secrecy::Secret;
use serde_json::Value;
use service_core::config::{Config as CoreConfig, Environment};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

/// Configuration for tests. The remote endpoints are never contacted because
/// the router is built over mocks.
pub fn test_config() -> ChatConfig {
    ChatConfig {
        common: CoreConfig { port: 0 },
        environment: Environment::Development,
        google: GoogleConfig {
            api_key: Secret::new("test-api-key".to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
            text_model: "gemini-2.0-flash".to_string(),
        },
        supabase: SupabaseConfig {
            url: "http://127.0.0.1:9".to_string(),
            anon_key: Secret::new("test-anon-key".to_string()),
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public"),
        otlp_endpoint: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub provider: Arc<MockTextProvider>,
    pub store: Arc<MockDataStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_provider(MockTextProvider::new(true))
    }

    pub fn with_provider(provider: MockTextProvider) -> Self {
        let provider = Arc::new(provider);
        let store = Arc::new(MockDataStore::new());
        let state = AppState::new(test_config(), provider.clone(), store.clone());

        Self {
            router: build_router(state),
            provider,
            store,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn post_raw(&self, uri: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }
}
