//! Discord direct-message delivery

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serenity::http::Http;
use serenity::model::id::UserId as DiscordUserId;
use std::sync::Arc;

use super::MessageGateway;
use crate::core::UserId;

/// Discord message content limit
const MESSAGE_LIMIT: usize = 2000;

/// Sends messages to users as Discord DMs
#[derive(Clone)]
pub struct DiscordGateway {
    http: Arc<Http>,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl MessageGateway for DiscordGateway {
    async fn send(&self, user_id: UserId, text: &str) -> Result<()> {
        let channel = DiscordUserId(user_id)
            .create_dm_channel(self.http.as_ref())
            .await
            .with_context(|| format!("Failed to open DM channel with user {user_id}"))?;

        channel
            .id
            .say(&self.http, truncate_for_message(text))
            .await
            .with_context(|| format!("Failed to send DM to user {user_id}"))?;

        debug!("📨 Sent DM to user {user_id} ({} chars)", text.len());
        Ok(())
    }
}

/// Truncate text to fit the Discord message limit on a UTF-8 boundary
pub fn truncate_for_message(text: &str) -> String {
    if text.len() <= MESSAGE_LIMIT {
        return text.to_string();
    }
    let mut end = MESSAGE_LIMIT - 3;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
