mod dispatch_actions;
mod process_utterance;

pub use dispatch_actions::*;
pub use process_utterance::*;
