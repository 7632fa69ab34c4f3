//! # SQLite Store
//!
//! Reminder records and the chat log, persisted in a single SQLite file.
//! Timestamps are stored as RFC 3339 UTC strings with millisecond precision so
//! they sort lexicographically.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use sqlite::{Connection, State, Statement};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::assistant::ConversationLog;
use crate::core::UserId;
use crate::features::reminders::{ReminderRecord, ReminderStatus, ReminderStore};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        text TEXT NOT NULL,
        deliver_at TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_status ON reminders (status, deliver_at);

    CREATE TABLE IF NOT EXISTS chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        user_message TEXT NOT NULL,
        bot_message TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_chat_messages_user ON chat_messages (user_id, created_at);
";

#[derive(Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and ensure the schema exists.
    /// `:memory:` gives a throwaway in-memory database.
    pub async fn new(path: &str) -> Result<Self> {
        let connection =
            sqlite::open(path).with_context(|| format!("Failed to open database at {path}"))?;
        connection
            .execute(SCHEMA)
            .context("Failed to initialize database schema")?;

        info!("💾 Database ready at {path}");
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    pub async fn get_reminder(&self, id: i64) -> Result<Option<ReminderRecord>> {
        let connection = self.connection.lock().await;
        read_reminder(&connection, id)
    }
}

#[async_trait]
impl ReminderStore for Database {
    async fn create_reminder(
        &self,
        user_id: UserId,
        text: &str,
        deliver_at: DateTime<Utc>,
    ) -> Result<ReminderRecord> {
        let connection = self.connection.lock().await;

        let mut insert = connection.prepare(
            "INSERT INTO reminders (user_id, text, deliver_at, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )?;
        insert.bind((1, user_id.to_string().as_str()))?;
        insert.bind((2, text))?;
        insert.bind((3, format_timestamp(deliver_at).as_str()))?;
        insert.bind((4, ReminderStatus::Pending.to_string().as_str()))?;
        insert.bind((5, format_timestamp(Utc::now()).as_str()))?;
        while let State::Row = insert.next()? {}

        let mut last_id = connection.prepare("SELECT last_insert_rowid()")?;
        last_id.next()?;
        let id = last_id.read::<i64, _>(0)?;

        let record = read_reminder(&connection, id)?
            .ok_or_else(|| anyhow::anyhow!("Reminder #{id} vanished after insert"))?;

        info!(
            "💾 Reminder saved: #{} user={} text=\"{}\" deliver_at={}",
            record.id,
            record.user_id,
            record.text,
            record.deliver_at.to_rfc3339()
        );
        Ok(record)
    }

    async fn mark_sent(&self, id: i64) -> Result<()> {
        let connection = self.connection.lock().await;

        let mut update = connection.prepare("UPDATE reminders SET status = ? WHERE id = ?")?;
        update.bind((1, ReminderStatus::Sent.to_string().as_str()))?;
        update.bind((2, id))?;
        while let State::Row = update.next()? {}

        if connection.change_count() == 0 {
            return Err(anyhow::anyhow!("Reminder #{id} not found"));
        }
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<ReminderRecord>> {
        let connection = self.connection.lock().await;

        let mut select = connection.prepare(
            "SELECT id, user_id, text, deliver_at, status, created_at
             FROM reminders
             WHERE status = ?
             ORDER BY deliver_at",
        )?;
        select.bind((1, ReminderStatus::Pending.to_string().as_str()))?;

        let mut reminders = Vec::new();
        while let State::Row = select.next()? {
            reminders.push(row_to_record(&select)?);
        }
        Ok(reminders)
    }
}

#[async_trait]
impl ConversationLog for Database {
    async fn save_chat(&self, user_id: UserId, user_message: &str, bot_message: &str) -> Result<()> {
        let connection = self.connection.lock().await;

        let mut insert = connection.prepare(
            "INSERT INTO chat_messages (user_id, user_message, bot_message, created_at)
             VALUES (?, ?, ?, ?)",
        )?;
        insert.bind((1, user_id.to_string().as_str()))?;
        insert.bind((2, user_message))?;
        insert.bind((3, bot_message))?;
        insert.bind((4, format_timestamp(Utc::now()).as_str()))?;
        while let State::Row = insert.next()? {}
        Ok(())
    }
}

fn read_reminder(connection: &Connection, id: i64) -> Result<Option<ReminderRecord>> {
    let mut select = connection.prepare(
        "SELECT id, user_id, text, deliver_at, status, created_at
         FROM reminders
         WHERE id = ?",
    )?;
    select.bind((1, id))?;

    match select.next()? {
        State::Row => Ok(Some(row_to_record(&select)?)),
        State::Done => Ok(None),
    }
}

fn row_to_record(row: &Statement) -> Result<ReminderRecord> {
    let id = row.read::<i64, _>("id")?;
    let user_id = row.read::<String, _>("user_id")?;

    Ok(ReminderRecord {
        id,
        user_id: user_id
            .parse()
            .with_context(|| format!("Reminder #{id} has invalid user_id {user_id:?}"))?,
        text: row.read::<String, _>("text")?,
        deliver_at: parse_timestamp(&row.read::<String, _>("deliver_at")?)?,
        status: row.read::<String, _>("status")?.parse()?,
        created_at: parse_timestamp(&row.read::<String, _>("created_at")?)?,
    })
}

fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp {value:?}"))
}
