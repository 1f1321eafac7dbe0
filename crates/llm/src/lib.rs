pub mod client;
pub mod json;
pub mod provider;
pub mod providers;
pub mod testing;

pub use client::LlmClient;
pub use provider::{FailureClass, LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
