//! Scripted provider for tests in this and downstream crates.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::provider::{LlmError, LlmProvider, Message};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(u16, String),
}

/// Answers with canned replies chosen by a substring of the prompt.
/// Rules are checked in insertion order; the first match wins. A prompt
/// matching no rule fails with a 500 `ApiError`.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    rules: Vec<(String, Reply)>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` when the prompt contains `needle`.
    pub fn reply(mut self, needle: &str, text: impl Into<String>) -> Self {
        self.rules.push((needle.to_string(), Reply::Text(text.into())));
        self
    }

    /// Fail with `ApiError { status, body }` when the prompt contains `needle`.
    pub fn fail(mut self, needle: &str, status: u16, body: impl Into<String>) -> Self {
        self.rules.push((needle.to_string(), Reply::Fail(status, body.into())));
        self
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if let Ok(mut seen) = self.prompts.lock() {
            seen.push(prompt.clone());
        }

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(status, body)) => Err(LlmError::ApiError { status, body }),
            None => Err(LlmError::ApiError {
                status: 500,
                body: "no scripted reply".into(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
