use serde::{Deserialize, Serialize};

const UNKNOWN_STATUS: &str = "unknown";

/// A controllable device as seen by the model for a single turn.
///
/// Built fresh from host state on every turn and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    id: String,
    domain: String,
    name: String,
    status: String,
    actions: Vec<String>,
}

impl EntitySnapshot {
    /// The display name falls back to the entity id and the status to
    /// `unknown` until the builder methods say otherwise.
    pub fn new(id: impl Into<String>, domain: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            domain: domain.into(),
            status: UNKNOWN_STATUS.to_string(),
            actions: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.name = name;
        }
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        let status = status.into();
        if !status.trim().is_empty() {
            self.status = status;
        }
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Comma-joined action names, as rendered into the prompt.
    pub fn action_list(&self) -> String {
        self.actions.join(",")
    }

    pub fn supports(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }
}
