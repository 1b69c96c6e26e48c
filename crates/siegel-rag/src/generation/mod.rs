//! Answer generation with LLM and source attribution

mod generator;
pub mod prompt;

pub use generator::{AnswerGenerator, GeneratedAnswer};
pub use prompt::PromptBuilder;
