use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub const DEFAULT_PROMPT: &str = "This smart home is controlled by Home Assistant.";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_MAX_TOKENS: u32 = 250;
pub const DEFAULT_TOP_P: f32 = 1.0;
pub const DEFAULT_TEMPERATURE: f32 = 0.5;
pub const DEFAULT_SESSION_CAPACITY: usize = 256;

/// User-tunable agent options.
///
/// Every field has a default, so a partial (or empty) options object is
/// valid:
///
/// ```json
/// { "prompt": "{{ ha_name }} is a small flat.", "temperature": 0.2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Preamble template, rendered against [`HostVariables`].
    pub prompt: String,
    pub chat_model: String,
    pub max_tokens: u32,
    pub top_p: f32,
    pub temperature: f32,
    /// Maximum number of conversations kept in memory.
    pub session_capacity: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            top_p: DEFAULT_TOP_P,
            temperature: DEFAULT_TEMPERATURE,
            session_capacity: DEFAULT_SESSION_CAPACITY,
        }
    }
}

impl AgentSettings {
    pub fn from_json_str(raw: &str) -> Result<Self, DomainError> {
        let settings: Self = serde_json::from_str(raw)
            .map_err(|e| DomainError::parse(format!("invalid options: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_session_capacity(mut self, capacity: usize) -> Self {
        self.session_capacity = capacity;
        self
    }

    /// Reject values the chat-completion API would refuse anyway.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chat_model.trim().is_empty() {
            return Err(DomainError::invalid_input("chat_model must not be empty"));
        }
        if self.max_tokens == 0 {
            return Err(DomainError::invalid_input("max_tokens must be positive"));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(DomainError::invalid_input(format!(
                "top_p must be within 0..=1, got {}",
                self.top_p
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DomainError::invalid_input(format!(
                "temperature must be within 0..=2, got {}",
                self.temperature
            )));
        }
        if self.session_capacity == 0 {
            return Err(DomainError::invalid_input(
                "session_capacity must be positive",
            ));
        }
        Ok(())
    }
}

/// Variables the host exposes to the preamble template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostVariables {
    #[serde(rename = "ha_name")]
    pub location_name: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl HostVariables {
    pub fn new(location_name: impl Into<String>) -> Self {
        Self {
            location_name: location_name.into(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}
