//! # Domain Layer
//!
//! Conversation models, the error type, and the pure services that build
//! prompts and interpret model output.
//! This layer is independent of external frameworks and infrastructure.

mod error;
pub mod models;
pub mod services;

pub use error::*;
pub use models::*;
pub use services::*;
