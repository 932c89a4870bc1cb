//! Mock provider implementation for testing.

use super::{
    ChatOptions, ChatSession, ProviderError, ProviderStream, TextChunk, TextCompletion,
    TextProvider,
};
use crate::models::{ChatTurn, Usage};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock text provider for testing.
///
/// Replies deterministically and remembers every prompt it was given. Failures
/// can be injected per step.
pub struct MockTextProvider {
    enabled: bool,
    fail_start_chat: bool,
    fail_mid_stream: bool,
    prompts: Mutex<Vec<String>>,
}

impl MockTextProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fail_start_chat: false,
            fail_mid_stream: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Make `start_chat` fail while generation still works.
    pub fn failing_start_chat(mut self) -> Self {
        self.fail_start_chat = true;
        self
    }

    /// Make streams break after their first text chunk.
    pub fn failing_mid_stream(mut self) -> Self {
        self.fail_mid_stream = true;
        self
    }

    /// Prompts and chat messages received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn check_enabled(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ))
        }
    }

    fn remember(&self, prompt: &str) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
    }

    fn usage_for(prompt: &str, output_tokens: i32) -> Usage {
        Usage::new(prompt.len() as i32 / 4, output_tokens)
    }

    fn chunks(&self, reply: &str, usage: Usage) -> ProviderStream {
        let mut chunks: Vec<Result<TextChunk, ProviderError>> = reply
            .split_inclusive(' ')
            .map(|word| Ok(TextChunk::Text(word.to_string())))
            .collect();

        if self.fail_mid_stream {
            chunks.truncate(1);
            chunks.push(Err(ProviderError::NetworkError(
                "Mock stream interrupted".to_string(),
            )));
        } else {
            chunks.push(Ok(TextChunk::Done { usage: Some(usage) }));
        }

        Box::pin(tokio_stream::iter(chunks))
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    async fn generate(&self, prompt: &str) -> Result<TextCompletion, ProviderError> {
        self.check_enabled()?;
        self.remember(prompt);

        Ok(TextCompletion {
            text: format!("Mock response for: {}", prompt),
            usage: Some(Self::usage_for(prompt, 10)),
        })
    }

    async fn generate_stream(&self, prompt: &str) -> Result<ProviderStream, ProviderError> {
        self.check_enabled()?;
        self.remember(prompt);

        let reply = format!("Mock streaming response for: {}", prompt);
        Ok(self.chunks(&reply, Self::usage_for(prompt, 5)))
    }

    async fn start_chat(
        &self,
        history: Vec<ChatTurn>,
        options: ChatOptions,
    ) -> Result<ChatSession, ProviderError> {
        if self.fail_start_chat {
            return Err(ProviderError::ApiError("Mock chat start failure".to_string()));
        }
        ChatSession::new(history, options)
    }

    async fn send_message(
        &self,
        session: &mut ChatSession,
        message: &str,
    ) -> Result<TextCompletion, ProviderError> {
        self.check_enabled()?;
        self.remember(message);

        let text = format!(
            "Mock reply to: {} (after {} turns)",
            message,
            session.history().len()
        );
        session.record_exchange(message, &text);

        Ok(TextCompletion {
            text,
            usage: Some(Self::usage_for(message, 10)),
        })
    }

    async fn send_message_stream(
        &self,
        session: &ChatSession,
        message: &str,
    ) -> Result<ProviderStream, ProviderError> {
        self.check_enabled()?;
        self.remember(message);

        let reply = format!(
            "Mock reply to: {} (after {} turns)",
            message,
            session.history().len()
        );
        Ok(self.chunks(&reply, Self::usage_for(message, 5)))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        self.check_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn stream_ends_with_usage() {
        let provider = MockTextProvider::new(true);
        let chunks: Vec<_> = provider.generate_stream("hi").await.unwrap().collect().await;

        let text: String = chunks
            .iter()
            .filter_map(|c| match c {
                Ok(TextChunk::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(text, "Mock streaming response for: hi");
        assert!(matches!(
            chunks.last(),
            Some(Ok(TextChunk::Done { usage: Some(_) }))
        ));
    }

    #[tokio::test]
    async fn mid_stream_failure_replaces_done() {
        let provider = MockTextProvider::new(true).failing_mid_stream();
        let chunks: Vec<_> = provider.generate_stream("hi").await.unwrap().collect().await;

        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[0], Ok(TextChunk::Text(t)) if t == "Mock "));
        assert!(matches!(chunks[1], Err(ProviderError::NetworkError(_))));
    }

    #[tokio::test]
    async fn disabled_provider_fails() {
        let provider = MockTextProvider::new(false);
        assert!(provider.generate("hi").await.is_err());
        assert!(provider.health_check().await.is_err());
    }
}
