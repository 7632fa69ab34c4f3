//! # Messaging Gateway
//!
//! Outbound side of the chat transport. Inbound messages arrive through the
//! serenity event handler in the `bot` binary and are handed to
//! [`crate::assistant::Assistant::handle_incoming_text`].
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

pub mod discord;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::UserId;

pub use discord::DiscordGateway;

/// Delivers text to a user
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(&self, user_id: UserId, text: &str) -> Result<()>;
}
