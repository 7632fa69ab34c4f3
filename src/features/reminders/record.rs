//! Reminder record and the store it lives in

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::UserId;

/// Delivery status of a reminder. Only ever moves from `Pending` to `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReminderStatus {
    /// Waiting for its delivery instant (or for a successful send)
    Pending,
    /// Delivered to the user
    Sent,
}

impl std::fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderStatus::Pending => write!(f, "pending"),
            ReminderStatus::Sent => write!(f, "sent"),
        }
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ReminderStatus::Pending),
            "sent" => Ok(ReminderStatus::Sent),
            _ => Err(anyhow::anyhow!("Invalid reminder status: {}", s)),
        }
    }
}

/// A persisted reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderRecord {
    /// Store-assigned identifier
    pub id: i64,

    /// User the reminder is addressed to
    pub user_id: UserId,

    /// What to remind about
    pub text: String,

    /// When the reminder must fire
    pub deliver_at: DateTime<Utc>,

    pub status: ReminderStatus,

    /// When the record was created (informational only)
    pub created_at: DateTime<Utc>,
}

impl ReminderRecord {
    pub fn is_pending(&self) -> bool {
        self.status == ReminderStatus::Pending
    }

    /// Whether the delivery instant has already passed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.deliver_at <= now
    }
}

/// Text the user receives when a reminder fires
pub fn format_notification(text: &str) -> String {
    format!("⏰ Reminder: {text}. So, how's it going?")
}

/// Persistent storage for reminder records
///
/// The store is the source of truth for every reminder; the scheduler only
/// keeps a transient timer per record.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Persist a new pending reminder and return it with its assigned id
    async fn create_reminder(
        &self,
        user_id: UserId,
        text: &str,
        deliver_at: DateTime<Utc>,
    ) -> Result<ReminderRecord>;

    /// Flip a reminder to `Sent`. Already-sent reminders stay sent.
    async fn mark_sent(&self, id: i64) -> Result<()>;

    /// All reminders still waiting for delivery
    async fn list_pending(&self) -> Result<Vec<ReminderRecord>>;
}
