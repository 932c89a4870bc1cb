//! Application startup and lifecycle management.

use crate::config::ChatConfig;
use crate::handlers::{app, auth, chat, diagnostics, generation, records};
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::{AuthRepository, ChatRepository, DataStore, SupabaseStore, UserRepository};
use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ChatConfig,
    pub text_provider: Arc<dyn TextProvider>,
    pub store: Arc<dyn DataStore>,
    pub users: UserRepository,
    pub chats: ChatRepository,
    pub auth: AuthRepository,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: ChatConfig,
        text_provider: Arc<dyn TextProvider>,
        store: Arc<dyn DataStore>,
    ) -> Self {
        Self {
            config,
            text_provider,
            users: UserRepository::new(store.clone()),
            chats: ChatRepository::new(store.clone()),
            auth: AuthRepository::new(store.clone()),
            store,
            started_at: Instant::now(),
        }
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            // Credentials are allowed, so a wildcard cannot be listed
            Ok(_) if o == "*" => {
                tracing::error!("Wildcard CORS origin is not allowed with credentials. Skipping.");
                None
            }
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

/// Build the full router: API routes, the chat page, static files and the
/// shared middleware stack.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();
    let cors = cors_layer(&state.config.cors.allowed_origins);

    Router::new()
        .route("/", get(app::root))
        .route("/health", get(app::health_check))
        .route("/metrics", get(app::metrics))
        .route_service("/chat-ui", ServeFile::new(static_dir.join("chat.html")))
        .route("/test-supabase", get(diagnostics::test_supabase))
        .route("/test-google-ai", get(diagnostics::test_google_ai))
        .route("/chat", post(chat::chat))
        .route("/chat/stream", post(chat::chat_stream))
        .route("/generate/stream", post(chat::generate_stream))
        .route("/generate-code", post(generation::generate_code))
        .route("/review-code", post(generation::review_code))
        .route("/summarize", post(generation::summarize))
        .route("/translate", post(generation::translate))
        .route("/answer", post(generation::answer))
        .route("/users", get(records::list_users).post(records::create_user))
        .route(
            "/users/:id",
            get(records::get_user)
                .patch(records::update_user)
                .delete(records::delete_user),
        )
        .route("/auth/users/:email", get(records::get_user_by_email))
        .route("/users/:id/rooms", get(records::list_user_rooms))
        .route("/rooms", post(records::create_room))
        .route("/rooms/:id/messages", get(records::list_room_messages))
        .route("/messages", post(records::create_message))
        .route("/auth/login", post(auth::login))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: ChatConfig) -> Result<Self, AppError> {
        let gemini_config = GeminiConfig {
            api_key: config.google.api_key.clone(),
            api_base: config.google.api_base.clone(),
            model: config.google.text_model.clone(),
        };
        let text_provider: Arc<dyn TextProvider> = Arc::new(
            GeminiTextProvider::new(gemini_config)
                .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?,
        );
        tracing::info!(
            model = %config.google.text_model,
            "Initialized Gemini text provider"
        );

        let supabase = SupabaseStore::new(config.supabase.clone())
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;
        if !supabase.is_configured() {
            tracing::warn!("Supabase URL or key missing; data store routes will fail");
        }
        let store: Arc<dyn DataStore> = Arc::new(supabase);
        tracing::info!(url = %config.supabase.url, "Initialized Supabase store");

        // Port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            environment = ?config.environment,
            origins = ?config.cors.allowed_origins,
            "Chat service listening on port {}",
            port
        );

        let router = build_router(AppState::new(config, text_provider, store));

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until a shutdown signal arrives.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}
