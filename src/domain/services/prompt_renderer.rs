use minijinja::{Environment, UndefinedBehavior};

use crate::domain::{DomainError, EntitySnapshot, HostVariables};

/// Separator between the fields of one rendered entity line.
pub const ENTITY_FIELD_DELIMITER: &str = "<>";

/// Fixed instruction block appended to the rendered preamble to form the
/// `system` message of every new conversation.
pub const SYSTEM_PROMPT: &str = "
You are the voice assistant of this home. Keep answers short and conversational.
When asked to control devices, answer only with the JSON described in the user message.";

const PROMPT_HEADER: &str = "\
Below is a list of devices, containing the device id, name, domain, state, and actions that can be performed.
The sections of the string are delimited by the string \"<>\"

Entities:
";

const PROMPT_INSTRUCTIONS: &str = r#"

JSON Template: { "entities": [ { "id": "", "domain": "", "action": "" } ], "assistant": "" }

Determine if the above prompt is a command related to the above entities. If the prompt is a command, respond only in JSON.

If the prompt is a command then:
    - Determine which entities relate to the above prompt and which action should be taken on those entities.
    - Respond only in the format of the above JSON Template.
    - Fill in the "assistant" field as a natural language responds for the action being taken.
    - Respond only with the JSON Template.

If it is not a command, answer the user's questions about the world truthfully.
"#;

/// Pure text construction for everything sent to the model.
pub struct PromptRenderer {
    env: Environment<'static>,
}

impl PromptRenderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        // Referencing a variable the host does not supply is an error,
        // not an empty string.
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Self { env }
    }

    /// One `id<>name<>domain<>status<>actions` line per entity, input order kept.
    pub fn render_entities(entities: &[EntitySnapshot]) -> String {
        let mut out = String::new();
        for entity in entities {
            out.push_str(&Self::render_entity(entity));
            out.push('\n');
        }
        out
    }

    pub fn render_entity(entity: &EntitySnapshot) -> String {
        [
            entity.id(),
            entity.name(),
            entity.domain(),
            entity.status(),
            entity.action_list().as_str(),
        ]
        .join(ENTITY_FIELD_DELIMITER)
    }

    /// Embed the entity block and the quoted utterance in the instruction
    /// template sent as the user message of the turn.
    pub fn render_prompt(entities_text: &str, utterance: &str) -> String {
        let mut out = String::from(PROMPT_HEADER);
        out.push_str(entities_text);
        out.push_str("\n\nPrompt: \"");
        out.push_str(utterance);
        out.push('"');
        out.push_str(PROMPT_INSTRUCTIONS);
        out
    }

    /// Render the user-configurable preamble template against host variables.
    pub fn render_preamble(
        &self,
        raw_template: &str,
        host_vars: &HostVariables,
    ) -> Result<String, DomainError> {
        self.env
            .render_str(raw_template, host_vars)
            .map_err(|e| DomainError::template(e.to_string()))
    }

    /// Rendered preamble followed by [`SYSTEM_PROMPT`].
    pub fn render_system_message(
        &self,
        raw_template: &str,
        host_vars: &HostVariables,
    ) -> Result<String, DomainError> {
        let preamble = self.render_preamble(raw_template, host_vars)?;
        Ok(format!("{preamble}{SYSTEM_PROMPT}"))
    }
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}
