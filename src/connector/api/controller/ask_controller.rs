use anyhow::Result;

use crate::{ConversationResult, DispatchOutcome};

use super::super::Container;

pub struct AskController<'a> {
    container: &'a Container,
}

impl<'a> AskController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn ask(
        &self,
        text: String,
        conversation_id: Option<String>,
        language: String,
        json: bool,
    ) -> Result<String> {
        let use_case = self.container.process_utterance_use_case();
        let result = use_case
            .execute(&text, conversation_id.as_deref(), &language)
            .await;

        if json {
            return Ok(serde_json::to_string_pretty(&result)?);
        }
        Ok(format_result(&result))
    }
}

/// Human-readable rendering of one turn, shared with the chat controller.
pub(super) fn format_result(result: &ConversationResult) -> String {
    let mut output = String::new();
    if result.is_error() {
        output.push_str("[error] ");
    }
    output.push_str(result.reply_text());
    output.push('\n');

    for outcome in result.dispatched() {
        let line = match outcome {
            DispatchOutcome::Invoked(action) => format!("  ✓ {}", action),
            DispatchOutcome::UnknownCapability(action) => {
                format!("  ? {} (unknown capability)", action)
            }
            DispatchOutcome::Failed { action, reason } => format!("  ✗ {} ({})", action, reason),
        };
        output.push_str(&line);
        output.push('\n');
    }

    output.push_str(&format!("Conversation: {}", result.conversation_id()));
    output
}
