use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Message, Role};

/// The transcript of one multi-turn exchange.
///
/// The first message is always the `system` preamble; everything after it is
/// appended in turn order and never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    id: String,
    messages: Vec<Message>,
}

impl ConversationSession {
    /// Start a session under a freshly generated identifier.
    pub fn start(system_preamble: impl Into<String>) -> Self {
        Self::with_id(Self::generate_id(), system_preamble)
    }

    pub fn with_id(id: impl Into<String>, system_preamble: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: vec![Message::system(system_preamble)],
        }
    }

    /// Time-ordered identifier, so ids sort in creation order.
    pub fn generate_id() -> String {
        Uuid::now_v7().simple().to_string()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn system_preamble(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role() == Role::System)
            .map(|m| m.content())
    }
}
