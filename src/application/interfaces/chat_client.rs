use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{AgentSettings, DomainError, Message};

/// One chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub top_p: f32,
    pub temperature: f32,
    /// End-user identifier forwarded to the provider (the conversation id).
    pub user: String,
}

impl ChatRequest {
    pub fn from_settings(
        settings: &AgentSettings,
        messages: Vec<Message>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: settings.chat_model.clone(),
            messages,
            max_tokens: settings.max_tokens,
            top_p: settings.top_p,
            temperature: settings.temperature,
            user: user.into(),
        }
    }
}

/// An interface for sending a chat transcript to an LLM and receiving the
/// assistant's text.
///
/// Implementors encapsulate transport, serialization, and vendor-specific API
/// details. Failures (auth, quota, network) surface as
/// [`DomainError::ProviderError`].
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns `choices[0].message.content` of the completion.
    async fn complete(&self, request: &ChatRequest) -> Result<String, DomainError>;
}
