//! Prompt construction for reminder extraction

use chrono::{DateTime, FixedOffset, Utc};

const INSTRUCTIONS: &str = r#"You are a chat assistant that creates reminders for users in different time zones.

Answer strictly with JSON in this format:
{
  "action": "reminder" | "chat",
  "message": "a short, friendly reply to the user that states the local time of the reminder",
  "reminder"?: {
    "text": "what to remind about",
    "datetime": "ISO 8601 time (UTC or with an offset)"
  }
}

Example:
User: "remind me to drink water in 10 minutes"
Answer:
{
  "action": "reminder",
  "message": "Okay! I'll remind you to drink water at 03:25 your time.",
  "reminder": {
    "text": "drink water",
    "datetime": "2025-10-30T03:25:00+05:00"
  }
}

If the user is not asking for a reminder, use "action": "chat" and put your reply in "message"."#;

/// Builds the prompt sent to the language model for one user message
///
/// ```ignore
/// let prompt = PromptBuilder::new("remind me to call mom at 6pm")
///     .with_offset(config.user_utc_offset)
///     .build();
/// ```
pub struct PromptBuilder<'a> {
    user_text: &'a str,
    now: DateTime<Utc>,
    offset: Option<FixedOffset>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(user_text: &'a str) -> Self {
        Self {
            user_text,
            now: Utc::now(),
            offset: None,
        }
    }

    /// Anchor relative times ("in 10 minutes") to a specific instant
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The user's UTC offset, so "at 6pm" resolves in their local time
    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::from(INSTRUCTIONS);

        prompt.push_str(&format!(
            "\n\nCurrent time (UTC): {}.",
            self.now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
        ));

        if let Some(offset) = self.offset {
            prompt.push_str(&format!(
                "\nThe user's local time is UTC{offset} (currently {}).",
                self.now.with_timezone(&offset).format("%Y-%m-%d %H:%M")
            ));
        }

        prompt.push_str(&format!("\nThe user wrote: \"{}\".", self.user_text));
        prompt.push_str("\nDetermine the date and time of the reminder precisely and correctly.");
        prompt
    }
}
