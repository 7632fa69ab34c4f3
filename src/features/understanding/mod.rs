//! # Understanding Feature
//!
//! Prompting the language model and validating what it sends back.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod client;
pub mod parser;
pub mod prompt;

pub use client::{LanguageModel, OpenAiModel};
pub use parser::{parse, ParseError, ParsedResponse, ReminderIntent, DEFAULT_CHAT_REPLY};
pub use prompt::PromptBuilder;
