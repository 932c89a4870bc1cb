//! What ends up in log output for user lookups.

mod common;

use axum::extract::{Path, State};
use chat_service::handlers::records;
use chat_service::services::MockDataStore;
use chat_service::services::providers::mock::MockTextProvider;
use chat_service::AppState;
use serde_json::json;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn email_lookup_span_omits_the_address() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = Arc::new(MockDataStore::new());
    store.seed("users", vec![json!({"id": 1, "email": "kim@example.com"})]);
    let state = AppState::new(
        common::test_config(),
        Arc::new(MockTextProvider::new(true)),
        store,
    );

    let result =
        records::get_user_by_email(State(state), Path("kim@example.com".to_string())).await;
    assert!(result.is_ok());

    let output = logs.text();
    assert!(output.contains("get_user_by_email"), "{}", output);
    assert!(!output.contains("kim@example.com"), "{}", output);
}
