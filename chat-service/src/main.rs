use chat_service::config::ChatConfig;
use chat_service::services::metrics::init_metrics;
use chat_service::startup::Application;
use service_core::observability::{init_tracing, shutdown_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ChatConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing("chat-service", "info", config.otlp_endpoint.as_deref())?;
    init_metrics();

    let app = Application::build(config).await?;
    tracing::info!("Server is running on http://localhost:{}", app.port());

    let result = app.run_until_stopped().await;
    shutdown_tracing();

    result.map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
