//! # Reminders Feature
//!
//! Persisted reminders delivered by single-shot timers, restored on startup.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod record;
mod recovery;
pub mod scheduler;

pub use record::{format_notification, ReminderRecord, ReminderStatus, ReminderStore};
pub use scheduler::{delay_until, DeliveryScheduler, ScheduleHandle};
