// Core layer - shared types, configuration, time formatting
pub mod core;

// Features layer - reminders, follow-ups, language understanding
pub mod features;

// Transport layer - outbound messaging
pub mod gateway;

// Infrastructure
pub mod database;

// Application layer - inbound message routing
pub mod assistant;

#[cfg(test)]
pub(crate) mod testing;

pub use assistant::{Assistant, ConversationLog};
pub use core::Config;
pub use database::Database;
pub use features::{
    // Follow-ups
    AckPhase, EscalationPolicy, FollowUpTracker,
    // Reminders
    DeliveryScheduler, ReminderRecord, ReminderStatus, ReminderStore,
    // Understanding
    LanguageModel, OpenAiModel, ParseError, ParsedResponse,
};
pub use gateway::{DiscordGateway, MessageGateway};
