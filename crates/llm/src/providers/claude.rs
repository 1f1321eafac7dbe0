use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{post_json, split_system};
use crate::provider::{LlmError, LlmProvider, Message, Role};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";

pub struct ClaudeProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn build_request_body(&self, messages: &[Message], temperature: f32, max_tokens: u32) -> Value {
        let (system, turns) = split_system(messages);
        let turns: Vec<Value> = turns
            .iter()
            .map(|m| {
                json!({
                    "role": if matches!(m.role, Role::Assistant) { "assistant" } else { "user" },
                    "content": m.content,
                })
            })
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": turns,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
        body
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let body = self.build_request_body(&messages, temperature, max_tokens);

        debug!(model = %self.model, "Claude request");

        let request = self
            .client
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let resp = post_json(request, &body).await?;

        resp["content"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::ParseError("missing content[0].text".into()))
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
