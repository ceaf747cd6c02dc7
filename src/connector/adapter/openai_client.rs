use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::application::{ChatClient, ChatRequest};
use crate::domain::DomainError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const COMPLETIONS_PATH: &str = "/chat/completions";
const MODELS_PATH: &str = "/models";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimal subset of the chat-completions response we care about.
#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// HTTP client for the OpenAI chat-completions API (and compatible servers).
///
/// ```text
/// OPENAI_API_KEY=sk-...
/// OPENAI_BASE_URL=https://api.openai.com/v1
/// ```
///
/// No retries: a failed call fails the turn.
pub struct OpenAiClient {
    client: reqwest::Client,
    verify_client: reqwest::Client,
    api_key: String,
    /// Full endpoint URL (base + COMPLETIONS_PATH).
    completions_url: String,
    models_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        let trimmed = base.trim_end_matches('/');
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            verify_client: reqwest::Client::builder()
                .timeout(VERIFY_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            completions_url: format!("{trimmed}{COMPLETIONS_PATH}"),
            models_url: format!("{trimmed}{MODELS_PATH}"),
        }
    }

    /// Construct from environment variables:
    ///
    /// | Variable          | Default                     |
    /// |-------------------|-----------------------------|
    /// | `OPENAI_API_KEY`  | required                    |
    /// | `OPENAI_BASE_URL` | `https://api.openai.com/v1` |
    pub fn from_env() -> Result<Self, DomainError> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| DomainError::invalid_input("OPENAI_API_KEY is not set"))?;
        Ok(Self::new(key, Self::configured_base_url()))
    }

    pub fn configured_base_url() -> String {
        std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
    }

    /// Cheap authenticated call used to validate the API key before the
    /// agent is put to use.
    pub async fn verify_credentials(&self) -> Result<(), DomainError> {
        let response = self
            .verify_client
            .get(&self.models_url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

fn transport_error(e: reqwest::Error) -> DomainError {
    if e.is_timeout() {
        DomainError::provider(format!("request timed out: {e}"))
    } else if e.is_connect() {
        DomainError::provider(format!("connection failed: {e}"))
    } else {
        DomainError::provider(format!("request failed: {e}"))
    }
}

fn status_error(status: StatusCode, body: &str) -> DomainError {
    let detail = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.trim().to_string());

    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "authentication failed",
        StatusCode::TOO_MANY_REQUESTS => "rate limit or quota exceeded",
        s if s.is_server_error() => "provider unavailable",
        _ => "request rejected",
    };

    if detail.is_empty() {
        DomainError::provider(format!("{kind} ({status})"))
    } else {
        DomainError::provider(format!("{kind} ({status}): {detail}"))
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, DomainError> {
        let response = self
            .client
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAiClient: API returned {status}: {body}");
            return Err(status_error(status, &body));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::provider(format!("failed to parse completion response: {e}"))
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("completion response had no choices"))?;

        let content = choice.message.content.unwrap_or_default();
        debug!("OpenAiClient: received {} characters", content.len());
        Ok(content)
    }
}
