mod fixture_home;
mod hass_rest_home;
mod lru_conversation_store;
mod mock_chat_client;
mod openai_client;

pub use fixture_home::*;
pub use hass_rest_home::*;
pub use lru_conversation_store::*;
pub use mock_chat_client::*;
pub use openai_client::*;
