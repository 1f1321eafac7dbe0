use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{chat_messages, post_json};
use crate::provider::{LlmError, LlmProvider, Message};

/// Local models through Ollama's `/api/chat`. Needs no credential.
pub struct OllamaProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.url);
        let body = json!({
            "model": self.model,
            "messages": chat_messages(&messages),
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        });

        debug!(model = %self.model, %url, "Ollama request");

        let resp = post_json(self.client.post(&url), &body).await?;

        resp["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::ParseError("missing message.content".into()))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
