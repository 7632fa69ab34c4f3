//! # Features Layer
//!
//! - `reminders`: persisted reminders, delivery timers, startup recovery
//! - `followup`: acknowledgement tracking and escalating nudges
//! - `understanding`: language-model prompting and response parsing

pub mod followup;
pub mod reminders;
pub mod understanding;

pub use followup::{AckPhase, EscalationPolicy, FollowUpTracker};
pub use reminders::{DeliveryScheduler, ReminderRecord, ReminderStatus, ReminderStore};
pub use understanding::{parse, LanguageModel, OpenAiModel, ParseError, ParsedResponse};
