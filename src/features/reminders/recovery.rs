//! Startup recovery of pending reminders

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;

use super::scheduler::DeliveryScheduler;

impl DeliveryScheduler {
    /// Re-arm every pending reminder in the store
    ///
    /// Run once at startup, before inbound messages are accepted. Each record
    /// keeps its stored `deliver_at`; overdue ones fire right away. Reminders
    /// already armed in this process are skipped, so calling this again is
    /// harmless. A store failure here is fatal to startup.
    ///
    /// Returns the number of reminders newly armed.
    pub async fn recover_all(&self) -> Result<usize> {
        let pending = self
            .store
            .list_pending()
            .await
            .context("Failed to load pending reminders")?;

        let now = Utc::now();
        let overdue = pending.iter().filter(|r| r.is_due(now)).count();
        info!(
            "📦 Restoring {} pending reminders ({} overdue)...",
            pending.len(),
            overdue
        );

        let armed = pending
            .into_iter()
            .filter_map(|record| self.schedule(record))
            .count();

        info!("📦 {armed} reminders re-armed");
        Ok(armed)
    }
}
