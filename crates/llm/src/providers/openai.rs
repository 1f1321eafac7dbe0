use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{chat_messages, post_json};
use crate::provider::{LlmError, LlmProvider, Message};

/// OpenAI chat completions, or any compatible endpoint via `OPENAI_BASE_URL`.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": chat_messages(&messages),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        debug!(model = %self.model, %url, "OpenAI request");

        let request = self.client.post(&url).bearer_auth(&self.api_key);
        let resp = post_json(request, &body).await?;

        resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))
    }

    fn name(&self) -> &str {
        "openai"
    }
}
