//! # Delivery Scheduler
//!
//! Turns a pending reminder into a single-shot timer that fires at its
//! `deliver_at` instant. The delay is computed fresh every time a record is
//! scheduled, so the same code path serves new reminders and ones restored after
//! a restart. Overdue reminders fire immediately.
//!
//! A pending reminder is armed at most once per process. On fire the
//! notification is sent, the record marked sent, and the follow-up loop armed,
//! in that order. Once the record is marked sent its id is forgotten. A failed
//! send is logged and the record stays pending (and its id stays reserved);
//! there is no retry.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::sleep;

use super::record::{format_notification, ReminderRecord, ReminderStore};
use crate::features::followup::FollowUpTracker;
use crate::gateway::MessageGateway;

/// Handle to an armed delivery timer
#[derive(Debug, Clone)]
pub struct ScheduleHandle {
    record_id: i64,
    abort: AbortHandle,
}

impl ScheduleHandle {
    pub fn record_id(&self) -> i64 {
        self.record_id
    }
}

pub struct DeliveryScheduler {
    pub(super) store: Arc<dyn ReminderStore>,
    gateway: Arc<dyn MessageGateway>,
    followups: Arc<FollowUpTracker>,
    /// Reminder ids armed in this process that have not been marked sent
    scheduled: Arc<DashMap<i64, AbortHandle>>,
}

impl DeliveryScheduler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        gateway: Arc<dyn MessageGateway>,
        followups: Arc<FollowUpTracker>,
    ) -> Self {
        Self {
            store,
            gateway,
            followups,
            scheduled: Arc::new(DashMap::new()),
        }
    }

    /// Arm the delivery timer for a reminder
    ///
    /// Returns `None` without arming anything if the reminder was already sent
    /// or has already been scheduled in this process.
    pub fn schedule(&self, record: ReminderRecord) -> Option<ScheduleHandle> {
        if !record.is_pending() {
            debug!("Reminder #{} already sent, not scheduling", record.id);
            return None;
        }

        let slot = match self.scheduled.entry(record.id) {
            Entry::Occupied(_) => {
                debug!("Reminder #{} already scheduled, skipping", record.id);
                return None;
            }
            Entry::Vacant(slot) => slot,
        };

        let record_id = record.id;
        let delay = delay_until(record.deliver_at, Utc::now());
        info!(
            "🕒 Scheduling reminder #{} for user {}: \"{}\" at {} (in {}s)",
            record.id,
            record.user_id,
            record.text,
            record.deliver_at.to_rfc3339(),
            delay.as_secs()
        );

        let store = self.store.clone();
        let gateway = self.gateway.clone();
        let followups = self.followups.clone();
        let scheduled = self.scheduled.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            if deliver(&record, store, gateway, followups).await {
                scheduled.remove(&record.id);
            }
        });

        let abort = task.abort_handle();
        slot.insert(abort.clone());

        Some(ScheduleHandle { record_id, abort })
    }

    /// Stop an armed timer. Returns false if the handle was not (or no longer)
    /// armed, including when its timer has already fired.
    pub fn cancel(&self, handle: &ScheduleHandle) -> bool {
        if handle.abort.is_finished() {
            return false;
        }
        match self.scheduled.remove(&handle.record_id) {
            Some(_) => {
                handle.abort.abort();
                info!("🛑 Cancelled reminder #{}", handle.record_id);
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, record_id: i64) -> bool {
        self.scheduled.contains_key(&record_id)
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }
}

/// Time left until `deliver_at`, clamped to zero for overdue reminders
pub fn delay_until(deliver_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    deliver_at
        .signed_duration_since(now)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Returns true once the record is marked sent
async fn deliver(
    record: &ReminderRecord,
    store: Arc<dyn ReminderStore>,
    gateway: Arc<dyn MessageGateway>,
    followups: Arc<FollowUpTracker>,
) -> bool {
    let notification = format_notification(&record.text);

    if let Err(e) = gateway.send(record.user_id, &notification).await {
        error!(
            "❌ Failed to deliver reminder #{} to user {}: {e:#} (left pending, not retried)",
            record.id, record.user_id
        );
        return false;
    }

    info!(
        "✅ Delivered reminder #{} to user {}: \"{}\"",
        record.id, record.user_id, record.text
    );

    let marked = match store.mark_sent(record.id).await {
        Ok(()) => true,
        Err(e) => {
            error!("❌ Reminder #{} was delivered but could not be marked sent: {e:#}", record.id);
            false
        }
    };

    followups.arm(record.user_id, &record.text).await;
    marked
}
