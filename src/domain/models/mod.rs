mod action;
mod conversation;
mod entity;
mod message;
mod settings;
mod turn;

pub use action::*;
pub use conversation::*;
pub use entity::*;
pub use message::*;
pub use settings::*;
pub use turn::*;
