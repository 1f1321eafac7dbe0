pub mod claude;
pub mod gemini;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use examly_core::config::{LlmConfig, OllamaConfig};
use serde_json::{json, Value};

use crate::provider::{LlmError, LlmProvider, Message, Role};

/// Create the LLM provider selected by `LLM_PROVIDER`.
///
/// A missing credential is reported here, once, instead of on every call.
pub fn create_provider(
    llm_config: &LlmConfig,
    ollama_config: &OllamaConfig,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match llm_config.provider.as_str() {
        "gemini" | "google" => {
            let api_key = llm_config
                .gemini_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY not set".into()))?;
            Ok(Arc::new(gemini::GeminiProvider::new(
                api_key.clone(),
                llm_config.gemini_model.clone(),
            )))
        }
        "openai" => {
            let api_key = llm_config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("OPENAI_API_KEY not set".into()))?;
            let base_url = llm_config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com");
            Ok(Arc::new(openai::OpenAiProvider::new(
                api_key.clone(),
                llm_config.openai_model.clone(),
                base_url.to_string(),
            )))
        }
        "anthropic" | "claude" => {
            let api_key = llm_config
                .anthropic_api_key
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("ANTHROPIC_API_KEY not set".into()))?;
            Ok(Arc::new(claude::ClaudeProvider::new(
                api_key.clone(),
                llm_config.anthropic_model.clone(),
            )))
        }
        "ollama" => Ok(Arc::new(ollama::OllamaProvider::new(
            ollama_config.url.clone(),
            ollama_config.model.clone(),
        ))),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}

/// POST a JSON body and return the decoded JSON reply. Any status other
/// than 200 becomes `ApiError` carrying the response body.
pub(crate) async fn post_json(
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value, LlmError> {
    let response = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await?;

    let status = response.status().as_u16();
    if status != 200 {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::ApiError { status, body });
    }

    Ok(response.json().await?)
}

/// Messages in the OpenAI-style `{role, content}` shape, system included.
pub(crate) fn chat_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| {
            json!({
                "role": match m.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                "content": m.content,
            })
        })
        .collect()
}

/// For APIs that take the system prompt out of band: the joined system
/// text (if any) and the remaining turns.
pub(crate) fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| matches!(m.role, Role::System))
        .map(|m| m.content.as_str())
        .collect();
    let turns = messages
        .iter()
        .filter(|m| !matches!(m.role, Role::System))
        .collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm_config(provider: &str) -> LlmConfig {
        LlmConfig {
            provider: provider.into(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".into(),
            openai_api_key: None,
            openai_model: "gpt-4o".into(),
            openai_base_url: None,
            anthropic_api_key: None,
            anthropic_model: "claude".into(),
            temperature: 0.4,
            max_tokens: 1024,
        }
    }

    fn ollama() -> OllamaConfig {
        OllamaConfig { url: "http://localhost:11434".into(), model: "llama3.2".into() }
    }

    #[test]
    fn missing_key_is_not_configured() {
        let err = create_provider(&llm_config("gemini"), &ollama()).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(ref m) if m.contains("GEMINI_API_KEY")));
        let err = create_provider(&llm_config("mystery"), &ollama()).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }

    #[test]
    fn builds_selected_provider() {
        let mut config = llm_config("gemini");
        config.gemini_api_key = Some("k".into());
        assert_eq!(create_provider(&config, &ollama()).unwrap().name(), "gemini");
        assert_eq!(create_provider(&llm_config("ollama"), &ollama()).unwrap().name(), "ollama");
    }

    #[test]
    fn system_messages_are_split_out() {
        let messages = vec![
            Message::system("a"),
            Message::user("q"),
            Message::system("b"),
        ];
        let (system, turns) = split_system(&messages);
        assert_eq!(system.as_deref(), Some("a\n\nb"));
        assert_eq!(turns.len(), 1);
        assert!(split_system(&[Message::user("q")]).0.is_none());
    }
}
