use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A chat message for the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Trait for LLM providers. Each backend implements this.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and return the assistant's response text.
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// How a failed call should be reported upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Missing or rejected credential. Operator problem.
    Configuration,
    /// Quota or rate limit. Retry later.
    RateLimited,
    Other,
}

const RATE_LIMIT_PHRASES: &[&str] = &["quota", "rate limit", "rate_limit", "resource_exhausted", "too many requests"];
const CREDENTIAL_PHRASES: &[&str] = &["api key", "api_key", "unauthenticated", "permission_denied", "invalid x-api-key"];

impl LlmError {
    pub fn classify(&self) -> FailureClass {
        match self {
            LlmError::NotConfigured(_) => FailureClass::Configuration,
            LlmError::ApiError { status: 429, .. } => FailureClass::RateLimited,
            LlmError::ApiError { status: 401 | 403, .. } => FailureClass::Configuration,
            other => {
                let message = other.to_string().to_lowercase();
                if RATE_LIMIT_PHRASES.iter().any(|p| message.contains(p)) {
                    FailureClass::RateLimited
                } else if CREDENTIAL_PHRASES.iter().any(|p| message.contains(p)) {
                    FailureClass::Configuration
                } else {
                    FailureClass::Other
                }
            }
        }
    }
}
