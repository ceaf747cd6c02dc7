use serde::{Deserialize, Serialize};

use super::DispatchOutcome;

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The reply came from the `assistant` field of a structured payload.
    Structured,
    /// No JSON object could be recovered; the raw model text is the reply.
    RawFallback,
    /// The preamble template failed to render; the model was not called.
    TemplateError,
    /// The chat-completion call failed.
    ProviderError,
    /// A payload was recovered but had no `assistant` field.
    AssistantFieldMissing,
}

impl TurnOutcome {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TurnOutcome::TemplateError
                | TurnOutcome::ProviderError
                | TurnOutcome::AssistantFieldMissing
        )
    }
}

/// Result of processing one utterance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationResult {
    reply_text: String,
    conversation_id: String,
    language: String,
    outcome: TurnOutcome,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dispatched: Vec<DispatchOutcome>,
}

impl ConversationResult {
    pub fn new(
        reply_text: impl Into<String>,
        conversation_id: impl Into<String>,
        language: impl Into<String>,
        outcome: TurnOutcome,
    ) -> Self {
        Self {
            reply_text: reply_text.into(),
            conversation_id: conversation_id.into(),
            language: language.into(),
            outcome,
            dispatched: Vec::new(),
        }
    }

    pub fn with_dispatched(mut self, dispatched: Vec<DispatchOutcome>) -> Self {
        self.dispatched = dispatched;
        self
    }

    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn outcome(&self) -> TurnOutcome {
        self.outcome
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_error()
    }

    /// Outcomes of the actions attempted this turn, in request order.
    pub fn dispatched(&self) -> &[DispatchOutcome] {
        &self.dispatched
    }
}
