//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Chat completions (OpenAI HTTP API, scripted mock)
//! - Home access (JSON fixture file, Home Assistant REST API)
//! - Conversation storage (bounded in-memory LRU)
//! - CLI api (container, router, controllers)

pub mod adapter;
pub mod api;

pub use adapter::*;
pub use api::*;
