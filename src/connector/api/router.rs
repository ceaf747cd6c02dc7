use anyhow::Result;

use crate::Commands;

use super::container::Container;
use super::controller::{AskController, ChatController, CheckController, EntitiesController};

pub struct Router<'a> {
    ask_controller: AskController<'a>,
    chat_controller: ChatController<'a>,
    entities_controller: EntitiesController<'a>,
    check_controller: CheckController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            ask_controller: AskController::new(container),
            chat_controller: ChatController::new(container),
            entities_controller: EntitiesController::new(container),
            check_controller: CheckController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<String> {
        match command {
            Commands::Ask {
                text,
                conversation_id,
                language,
                json,
            } => {
                self.ask_controller
                    .ask(text, conversation_id, language, json)
                    .await
            }
            Commands::Chat { language } => self.chat_controller.chat(language).await,
            Commands::Entities => self.entities_controller.entities().await,
            Commands::Check => self.check_controller.check().await,
        }
    }
}
