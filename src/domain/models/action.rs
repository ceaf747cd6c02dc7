use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A single device action the model asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub id: String,
    pub domain: String,
    pub action: String,
}

impl ActionRequest {
    pub fn new(
        id: impl Into<String>,
        domain: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            action: action.into(),
        }
    }

    /// `domain.action` form used in logs.
    pub fn capability(&self) -> String {
        format!("{}.{}", self.domain, self.action)
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.domain, self.action, self.id)
    }
}

/// Structured reply recovered from model output:
/// `{"entities": [ActionRequest], "assistant": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionPayload {
    actions: Vec<ActionRequest>,
    rejected: Vec<Value>,
    assistant: Option<String>,
}

impl ActionPayload {
    /// Interpret a parsed JSON object.
    ///
    /// A missing or `null` `entities` key means zero actions. Elements that do
    /// not carry string `id`, `domain` and `action` fields are set aside as
    /// rejected without affecting their siblings.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut actions = Vec::new();
        let mut rejected = Vec::new();

        match object.get("entities") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for item in items {
                    match serde_json::from_value::<ActionRequest>(item.clone()) {
                        Ok(action) => actions.push(action),
                        Err(e) => {
                            warn!("Skipping malformed action entry {}: {}", item, e);
                            rejected.push(item.clone());
                        }
                    }
                }
            }
            Some(other) => {
                warn!("Ignoring non-array \"entities\" field: {}", other);
                rejected.push(other.clone());
            }
        }

        let assistant = match object.get("assistant") {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(text.clone()),
            Some(other) => Some(other.to_string()),
        };

        Self {
            actions,
            rejected,
            assistant,
        }
    }

    pub fn actions(&self) -> &[ActionRequest] {
        &self.actions
    }

    pub fn rejected(&self) -> &[Value] {
        &self.rejected
    }

    pub fn assistant(&self) -> Option<&str> {
        self.assistant.as_deref()
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// What happened to one [`ActionRequest`] during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The host accepted the invocation.
    Invoked(ActionRequest),
    /// No such `(domain, action)` capability is registered; skipped.
    UnknownCapability(ActionRequest),
    /// The host rejected the invocation.
    Failed { action: ActionRequest, reason: String },
}

impl DispatchOutcome {
    pub fn action(&self) -> &ActionRequest {
        match self {
            DispatchOutcome::Invoked(action) => action,
            DispatchOutcome::UnknownCapability(action) => action,
            DispatchOutcome::Failed { action, .. } => action,
        }
    }

    pub fn is_invoked(&self) -> bool {
        matches!(self, DispatchOutcome::Invoked(_))
    }
}
