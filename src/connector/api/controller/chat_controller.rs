use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::application::{ATTRIBUTION_NAME, ATTRIBUTION_URL, SUPPORTED_LANGUAGES};

use super::super::Container;
use super::ask_controller::format_result;

const EXIT_COMMANDS: [&str; 2] = ["exit", "quit"];

pub struct ChatController<'a> {
    container: &'a Container,
}

impl<'a> ChatController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Read utterances line by line until EOF or `exit`, carrying the
    /// conversation id from one turn to the next.
    pub async fn chat(&self, language: String) -> Result<String> {
        let use_case = self.container.process_utterance_use_case();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        stdout
            .write_all(
                format!(
                    "Chatting with {} ({}, {}). Languages: {}. Type 'exit' to quit.\n",
                    use_case.settings().chat_model,
                    ATTRIBUTION_NAME,
                    ATTRIBUTION_URL,
                    SUPPORTED_LANGUAGES
                )
                .as_bytes(),
            )
            .await?;

        let mut conversation_id: Option<String> = None;
        let mut turns = 0usize;

        loop {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if EXIT_COMMANDS.contains(&text) {
                break;
            }

            let result = use_case
                .execute(text, conversation_id.as_deref(), &language)
                .await;
            conversation_id = Some(result.conversation_id().to_string());
            turns += 1;

            stdout
                .write_all(format!("{}\n", format_result(&result)).as_bytes())
                .await?;
        }

        Ok(match conversation_id {
            Some(id) => format!("Conversation {} ended after {} turns.", id, turns),
            None => "No conversation started.".to_string(),
        })
    }
}
