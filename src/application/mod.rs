//! # Application Layer
//!
//! Collaborator interfaces and the use cases that orchestrate a conversation
//! turn over them.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
