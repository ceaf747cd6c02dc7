use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::{ChatClient, ChatRequest};
use crate::domain::DomainError;

const DEFAULT_RESPONSE: &str = r#"{"entities": [], "assistant": "This is a mock reply."}"#;

/// Offline [`ChatClient`] returning scripted responses in order, then a
/// default response. Every request is recorded.
pub struct MockChatClient {
    scripted: Mutex<VecDeque<Result<String, String>>>,
    default_response: String,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::with_default_response(DEFAULT_RESPONSE)
    }

    pub fn with_default_response(response: impl Into<String>) -> Self {
        Self {
            scripted: Mutex::new(VecDeque::new()),
            default_response: response.into(),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a successful completion.
    pub async fn push_response(&self, content: impl Into<String>) {
        self.scripted.lock().await.push_back(Ok(content.into()));
    }

    /// Queue a provider failure.
    pub async fn push_error(&self, message: impl Into<String>) {
        self.scripted.lock().await.push_back(Err(message.into()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().await.last().cloned()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        match self.scripted.lock().await.pop_front() {
            Some(Ok(content)) => Ok(content),
            Some(Err(message)) => Err(DomainError::provider(message)),
            None => Ok(self.default_response.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentSettings, Message};

    fn request() -> ChatRequest {
        ChatRequest::from_settings(&AgentSettings::default(), vec![Message::user("hi")], "c1")
    }

    #[tokio::test]
    async fn scripted_responses_come_first() {
        let client = MockChatClient::new();
        client.push_response("first").await;
        client.push_error("quota exceeded").await;

        assert_eq!(client.complete(&request()).await.unwrap(), "first");
        assert!(client.complete(&request()).await.unwrap_err().is_provider_error());
        assert_eq!(client.complete(&request()).await.unwrap(), DEFAULT_RESPONSE);
        assert_eq!(client.call_count(), 3);
        assert_eq!(client.requests().await.len(), 3);
    }
}
