//! Prometheus metrics for chat-service.
//!
//! HTTP request metrics come from the shared middleware; this module adds
//! provider and data-store call metrics and owns the exporter handle.

use crate::models::Usage;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

fn status_label(ok: bool) -> &'static str {
    if ok { "success" } else { "error" }
}

/// Record one call to an upstream service.
pub fn record_provider_call(provider: &'static str, operation: &'static str, ok: bool, elapsed: Duration) {
    let labels = [
        ("provider", provider),
        ("operation", operation),
        ("status", status_label(ok)),
    ];
    counter!("upstream_requests_total", &labels).increment(1);
    histogram!("upstream_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Record token consumption reported by the AI service.
pub fn record_tokens(model: &str, usage: &Usage) {
    let model = model.to_string();
    counter!("genai_tokens_total", "model" => model.clone(), "type" => "input")
        .increment(usage.input_tokens().max(0) as u64);
    counter!("genai_tokens_total", "model" => model, "type" => "output")
        .increment(usage.output_tokens().max(0) as u64);
}
