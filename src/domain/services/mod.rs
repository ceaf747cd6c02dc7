//! Domain services: pure prompt construction and response interpretation.

mod prompt_renderer;
mod response_extractor;

pub use prompt_renderer::*;
pub use response_extractor::*;
