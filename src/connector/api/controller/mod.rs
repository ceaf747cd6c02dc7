pub mod ask_controller;
pub mod chat_controller;
pub mod check_controller;
pub mod entities_controller;

pub use ask_controller::AskController;
pub use chat_controller::ChatController;
pub use check_controller::CheckController;
pub use entities_controller::EntitiesController;
