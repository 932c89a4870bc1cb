//! Generative-AI provider abstractions and implementations.
//!
//! Handlers only see `Arc<dyn TextProvider>`, so the Gemini backend can be
//! swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use crate::models::{ChatTurn, Role, Usage};
use async_trait::async_trait;
use std::pin::Pin;
use thiserror::Error;
use tokio_stream::Stream;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered: {0}")]
    ContentFiltered(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Result of a non-streaming generation call.
#[derive(Debug, Clone)]
pub struct TextCompletion {
    pub text: String,
    /// Absent when the service did not report usage.
    pub usage: Option<Usage>,
}

/// Stream chunk for streaming responses.
#[derive(Debug, Clone)]
pub enum TextChunk {
    Text(String),

    /// Final chunk with usage stats.
    Done { usage: Option<Usage> },
}

/// Type alias for provider streams.
pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<TextChunk, ProviderError>> + Send>>;

/// Generation settings applied to every turn of a chat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub max_output_tokens: i32,
    pub temperature: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 2048,
            temperature: 0.7,
        }
    }
}

/// A chat seeded with prior history. The remote service keeps no state, so
/// the session is just the validated history plus options.
#[derive(Debug, Clone)]
pub struct ChatSession {
    history: Vec<ChatTurn>,
    options: ChatOptions,
}

impl ChatSession {
    /// Validate `history` the way the chat API expects it: the first turn
    /// comes from the user and no turn is empty.
    pub fn new(history: Vec<ChatTurn>, options: ChatOptions) -> Result<Self, ProviderError> {
        if let Some(first) = history.first() {
            if first.role != Role::User {
                return Err(ProviderError::InvalidRequest(format!(
                    "First content should be with role 'user', got {}",
                    first.role
                )));
            }
        }

        if let Some(index) = history.iter().position(|turn| turn.parts.is_empty()) {
            return Err(ProviderError::InvalidRequest(format!(
                "History entry {} has no parts",
                index
            )));
        }

        Ok(Self { history, options })
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn options(&self) -> ChatOptions {
        self.options
    }

    /// History followed by the next user turn, as sent on the wire.
    pub fn contents_with(&self, message: &str) -> Vec<ChatTurn> {
        let mut contents = self.history.clone();
        contents.push(ChatTurn::user(message));
        contents
    }

    /// Record a completed exchange.
    pub fn record_exchange(&mut self, message: &str, reply: &str) {
        self.history.push(ChatTurn::user(message));
        self.history.push(ChatTurn::model(reply));
    }
}

/// Trait for text and chat generation providers (e.g., Gemini).
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Single-turn text generation.
    async fn generate(&self, prompt: &str) -> Result<TextCompletion, ProviderError>;

    /// Single-turn streaming generation.
    async fn generate_stream(&self, prompt: &str) -> Result<ProviderStream, ProviderError>;

    /// Start a chat from prior history.
    async fn start_chat(
        &self,
        history: Vec<ChatTurn>,
        options: ChatOptions,
    ) -> Result<ChatSession, ProviderError> {
        ChatSession::new(history, options)
    }

    /// Send a user message within a chat. On success the exchange is
    /// appended to the session history.
    async fn send_message(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<TextCompletion, ProviderError>;

    /// Streaming variant of `send_message`; the session is left unchanged.
    async fn send_message_stream(
        &self,
        session: &ChatSession,
        message: &str,
    ) -> Result<ProviderStream, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
