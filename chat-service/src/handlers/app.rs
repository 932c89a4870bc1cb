use axum::{extract::State, response::IntoResponse, Json};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::services::metrics;
use crate::startup::AppState;

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Service banner.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "NewChatAI API Server",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "timestamp": timestamp()
    }))
}

/// Liveness probe; uptime is seconds since the server started.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": timestamp(),
        "uptime": state.started_at.elapsed().as_secs_f64()
    }))
}

pub async fn metrics() -> impl IntoResponse {
    metrics::get_metrics()
}
