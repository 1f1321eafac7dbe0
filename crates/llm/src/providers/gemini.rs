use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{post_json, split_system};
use crate::provider::{LlmError, LlmProvider, Message, Role};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: API_BASE.to_string(),
        }
    }

    /// Build the request body for the generateContent API.
    fn build_request_body(
        messages: &[Message],
        temperature: f32,
        max_tokens: u32,
    ) -> Value {
        let (system, turns) = split_system(messages);

        let contents: Vec<Value> = turns
            .iter()
            .map(|m| {
                json!({
                    "role": if matches!(m.role, Role::Assistant) { "model" } else { "user" },
                    "parts": [{ "text": m.content }],
                })
            })
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": temperature,
                "maxOutputTokens": max_tokens,
            },
        });

        if let Some(system) = system {
            body["system_instruction"] = json!({
                "parts": [{ "text": system }],
            });
        }

        body
    }

    /// Concatenated text of the first candidate's parts. A blocked prompt
    /// is reported with its block reason.
    fn response_text(resp: &Value) -> Result<String, LlmError> {
        if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
            return Err(LlmError::ParseError(format!("prompt blocked: {reason}")));
        }

        let parts = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| LlmError::ParseError("missing candidates[0].content.parts".into()))?;

        Ok(parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::build_request_body(&messages, temperature, max_tokens);

        debug!(model = %self.model, "Gemini request");

        let request = self.client.post(&url).header("x-goog-api-key", &self.api_key);
        let resp = post_json(request, &body).await?;
        Self::response_text(&resp)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_structure() {
        let messages = vec![
            Message::system("Answer in JSON."),
            Message::user("Summarize"),
            Message { role: Role::Assistant, content: "{}".into() },
        ];

        let body = GeminiProvider::build_request_body(&messages, 0.4, 4096);

        assert_eq!(
            body["system_instruction"]["parts"][0]["text"].as_str().unwrap(),
            "Answer in JSON.",
        );

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");

        let temp = body["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((temp - 0.4).abs() < 1e-6, "temperature should be ~0.4, got {temp}");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);
    }

    #[test]
    fn test_request_body_without_system() {
        let body = GeminiProvider::build_request_body(&[Message::user("Hello")], 0.5, 2048);
        assert!(body.get("system_instruction").is_none());
    }

    #[test]
    fn response_parts_are_joined() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] } }]
        });
        assert_eq!(GeminiProvider::response_text(&resp).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blocked_prompt_is_an_error() {
        let resp = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let err = GeminiProvider::response_text(&resp).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let err = GeminiProvider::response_text(&json!({})).unwrap_err();
        assert!(matches!(err, LlmError::ParseError(_)));
    }
}
