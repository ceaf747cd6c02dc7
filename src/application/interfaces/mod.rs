mod capability_registry;
mod chat_client;
mod conversation_store;
mod entity_provider;

pub use capability_registry::*;
pub use chat_client::*;
pub use conversation_store::*;
pub use entity_provider::*;
