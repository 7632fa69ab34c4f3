//! # Follow-up Feature
//!
//! Escalating nudges after a reminder is delivered, until the user replies.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod tracker;

pub use tracker::{AckPhase, AckState, EscalationPolicy, EscalationStep, FollowUpTracker};
