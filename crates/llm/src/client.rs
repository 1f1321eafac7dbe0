use std::sync::Arc;

use examly_core::config::LlmConfig;
use tracing::debug;

use crate::provider::{LlmError, LlmProvider, Message};

/// A provider bound to the generation settings from config. This is what
/// the rest of the application holds; it is cheap to clone.
#[derive(Clone)]
pub struct LlmClient {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LlmProvider>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    pub fn from_config(provider: Arc<dyn LlmProvider>, config: &LlmConfig) -> Self {
        Self::new(provider, config.temperature, config.max_tokens)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Single-turn generation: one user prompt in, response text out.
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.chat(vec![Message::user(prompt)]).await
    }

    pub async fn chat(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let started = std::time::Instant::now();
        let result = self
            .provider
            .complete(messages, self.temperature, self.max_tokens)
            .await;
        debug!(
            provider = self.provider.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "llm call finished"
        );
        result
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("provider", &self.provider.name())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
