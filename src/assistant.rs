//! # Assistant
//!
//! Single entry point for inbound user text. Routing order:
//! 1. a user being nudged about a reminder has their message taken as the
//!    acknowledgement, nothing else happens;
//! 2. otherwise the language model interprets the message;
//! 3. a reminder intent is persisted and scheduled, anything else is answered
//!    directly.
//!
//! Every failure on this path becomes a reply to the user; nothing here can
//! take the process down.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{format_local, format_relative, UserId};
use crate::features::followup::FollowUpTracker;
use crate::features::reminders::{DeliveryScheduler, ReminderStore};
use crate::features::understanding::{
    parse, LanguageModel, ParsedResponse, PromptBuilder, ReminderIntent,
};

const AI_ERROR_REPLY: &str = "⚠️ Something went wrong talking to the AI. Try again later.";
const NOT_UNDERSTOOD_REPLY: &str = "🤔 I didn't catch that, could you say it differently?";
const SAVE_FAILED_REPLY: &str = "⚠️ I couldn't save that reminder, please try again later.";

/// Append-only log of what users said and what the bot answered
#[async_trait]
pub trait ConversationLog: Send + Sync {
    async fn save_chat(&self, user_id: UserId, user_message: &str, bot_message: &str) -> Result<()>;
}

pub struct Assistant {
    store: Arc<dyn ReminderStore>,
    history: Arc<dyn ConversationLog>,
    model: Arc<dyn LanguageModel>,
    scheduler: Arc<DeliveryScheduler>,
    followups: Arc<FollowUpTracker>,
    user_utc_offset: FixedOffset,
}

impl Assistant {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        history: Arc<dyn ConversationLog>,
        model: Arc<dyn LanguageModel>,
        scheduler: Arc<DeliveryScheduler>,
        followups: Arc<FollowUpTracker>,
        user_utc_offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            history,
            model,
            scheduler,
            followups,
            user_utc_offset,
        }
    }

    /// Handle one inbound message and return the reply to post back
    pub async fn handle_incoming_text(&self, user_id: UserId, text: &str) -> String {
        let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let text = text.trim();
        info!("[{request_id}] 💬 User {user_id} wrote: \"{text}\"");

        let reply = self.route(&request_id, user_id, text).await;

        if let Err(e) = self.history.save_chat(user_id, text, &reply).await {
            warn!("[{request_id}] Failed to save chat history: {e:#}");
        }
        reply
    }

    async fn route(&self, request_id: &str, user_id: UserId, text: &str) -> String {
        if let Some(closing) = self.followups.on_user_message(user_id).await {
            return closing;
        }

        if text.is_empty() {
            return NOT_UNDERSTOOD_REPLY.to_string();
        }

        let prompt = PromptBuilder::new(text)
            .with_offset(self.user_utc_offset)
            .build();

        let raw = match self.model.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("[{request_id}] ❌ Language model request failed: {e:#}");
                return AI_ERROR_REPLY.to_string();
            }
        };

        if raw.trim().is_empty() {
            warn!("[{request_id}] ⚠️ Language model returned an empty response");
            return NOT_UNDERSTOOD_REPLY.to_string();
        }

        match parse(&raw) {
            Ok(ParsedResponse::Chat(message)) => message,
            Ok(ParsedResponse::Reminder(intent)) => {
                self.create_reminder(request_id, user_id, intent).await
            }
            Err(e) => {
                warn!("[{request_id}] ⚠️ Unusable model response ({e}): {raw}");
                e.user_reply().to_string()
            }
        }
    }

    async fn create_reminder(
        &self,
        request_id: &str,
        user_id: UserId,
        intent: ReminderIntent,
    ) -> String {
        let record = match self
            .store
            .create_reminder(user_id, &intent.text, intent.datetime)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!("[{request_id}] ❌ Failed to save reminder for user {user_id}: {e:#}");
                return SAVE_FAILED_REPLY.to_string();
            }
        };

        let local_time = format_local(record.deliver_at, self.user_utc_offset);
        let relative = format_relative(record.deliver_at, Utc::now());
        info!(
            "[{request_id}] ⏰ Reminder #{} \"{}\" set for {} ({local_time} local)",
            record.id,
            record.text,
            record.deliver_at.to_rfc3339()
        );

        let reply = format!(
            "✅ Okay! I'll remind you \"{}\" at {local_time} your time ({relative}).",
            record.text
        );
        self.scheduler.schedule(record);
        reply
    }
}
