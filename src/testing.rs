//! In-memory collaborators for unit tests

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::assistant::ConversationLog;
use crate::core::UserId;
use crate::features::reminders::{ReminderRecord, ReminderStatus, ReminderStore};
use crate::features::understanding::LanguageModel;
use crate::gateway::MessageGateway;

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<ReminderRecord>>,
    chats: Mutex<Vec<(UserId, String, String)>>,
    next_id: AtomicI64,
    failing_reads: AtomicBool,
    failing_writes: AtomicBool,
}

impl MemoryStore {
    pub fn insert(
        &self,
        user_id: UserId,
        text: &str,
        deliver_at: DateTime<Utc>,
        status: ReminderStatus,
    ) -> ReminderRecord {
        let record = ReminderRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id,
            text: text.to_string(),
            deliver_at,
            status,
            created_at: Utc::now(),
        };
        self.records.lock().unwrap().push(record.clone());
        record
    }

    pub fn get(&self, id: i64) -> Option<ReminderRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<ReminderRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn chats(&self) -> Vec<(UserId, String, String)> {
        self.chats.lock().unwrap().clone()
    }

    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub fn set_failing_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<()> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn create_reminder(
        &self,
        user_id: UserId,
        text: &str,
        deliver_at: DateTime<Utc>,
    ) -> Result<ReminderRecord> {
        self.check_writes()?;
        Ok(self.insert(user_id, text, deliver_at, ReminderStatus::Pending))
    }

    async fn mark_sent(&self, id: i64) -> Result<()> {
        self.check_writes()?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("Reminder #{id} not found"))?;
        record.status = ReminderStatus::Sent;
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<ReminderRecord>> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("store unavailable"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ConversationLog for MemoryStore {
    async fn save_chat(&self, user_id: UserId, user_message: &str, bot_message: &str) -> Result<()> {
        self.check_writes()?;
        self.chats.lock().unwrap().push((
            user_id,
            user_message.to_string(),
            bot_message.to_string(),
        ));
        Ok(())
    }
}

/// Records every successful send; can be switched to fail or slowed down
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<(UserId, String)>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
    send_delay_ms: AtomicU64,
}

impl RecordingGateway {
    pub fn sent_to(&self, user_id: UserId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every send takes this long before it is recorded
    pub fn set_send_delay(&self, delay: Duration) {
        self.send_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn send(&self, user_id: UserId, text: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let delay_ms = self.send_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("gateway unavailable"));
        }
        self.sent.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }
}

/// Returns a fixed response (or error) and remembers the prompts it saw
pub struct ScriptedModel {
    response: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn replying(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            response: Err(error.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.response.clone().map_err(|e| anyhow::anyhow!(e))
    }
}
