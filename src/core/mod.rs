//! # Core Module
//!
//! Core domain types, configuration, and time formatting for the reminder bot.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod config;
pub mod time;

/// Identifier of the addressed user (the Discord user snowflake)
pub type UserId = u64;

// Re-export commonly used items
pub use config::Config;
pub use time::{format_local, format_relative, parse_utc_offset};
