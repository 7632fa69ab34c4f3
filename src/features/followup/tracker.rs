//! # Feature: Follow-up Tracker
//!
//! Per-user acknowledgement state after a reminder is delivered. While a user
//! is awaiting reply, escalating nudges are sent on a fixed schedule; the first
//! message from the user (or the last nudge) closes the loop.
//!
//! Each user's state sits behind its own async mutex. Arming, every escalation
//! check and every inbound reply take that lock, so a nudge can never slip in
//! between a reply being read and the state being cleared. Different users
//! never share a lock.
//!
//! State is in-memory only and does not survive a restart.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

use crate::core::UserId;
use crate::gateway::MessageGateway;

const NUDGE_MESSAGES: [&str; 2] = [
    "Hey, how did it go? All done?",
    "It's gone quiet... hope everything's alright?",
];
const FINAL_MESSAGE: &str = "Alright, I'll count this one as done ☑️ (no reply received)";
const CLOSING_MESSAGE: &str = "✅ Great! I'll count this one as done.";

/// Where a user sits in the acknowledgement loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPhase {
    Idle,
    AwaitingReply,
}

/// A single follow-up nudge, relative to the moment the tracker was armed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationStep {
    pub delay: Duration,
    pub message: String,
}

/// Ordered escalation steps plus the reply used when the user acknowledges
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    steps: Vec<EscalationStep>,
    closing_message: String,
}

impl EscalationPolicy {
    /// Build a policy from explicit steps
    ///
    /// Returns `None` when `steps` is empty: without a final step nothing would
    /// ever return the user to `Idle`.
    pub fn new(steps: Vec<EscalationStep>, closing_message: impl Into<String>) -> Option<Self> {
        if steps.is_empty() {
            return None;
        }
        Some(Self {
            steps,
            closing_message: closing_message.into(),
        })
    }

    /// Standard wording with custom delays (in minutes)
    ///
    /// Earlier steps cycle through the nudge messages, the last step always
    /// gets the closing-the-loop message.
    pub fn from_minutes(minutes: &[u64]) -> Option<Self> {
        Self::from_delays(minutes.iter().map(|m| Duration::from_secs(m * 60)))
    }

    pub(crate) fn from_delays(delays: impl IntoIterator<Item = Duration>) -> Option<Self> {
        let delays: Vec<Duration> = delays.into_iter().collect();
        let last = delays.len().checked_sub(1)?;
        let steps = delays
            .into_iter()
            .enumerate()
            .map(|(index, delay)| EscalationStep {
                delay,
                message: if index == last {
                    FINAL_MESSAGE.to_string()
                } else {
                    NUDGE_MESSAGES[index % NUDGE_MESSAGES.len()].to_string()
                },
            })
            .collect();
        Self::new(steps, CLOSING_MESSAGE)
    }

    pub fn steps(&self) -> &[EscalationStep] {
        &self.steps
    }

    pub fn closing_message(&self) -> &str {
        &self.closing_message
    }
}

impl Default for EscalationPolicy {
    /// +7, +25 and +60 minutes
    fn default() -> Self {
        Self {
            steps: vec![
                EscalationStep {
                    delay: Duration::from_secs(7 * 60),
                    message: NUDGE_MESSAGES[0].to_string(),
                },
                EscalationStep {
                    delay: Duration::from_secs(25 * 60),
                    message: NUDGE_MESSAGES[1].to_string(),
                },
                EscalationStep {
                    delay: Duration::from_secs(60 * 60),
                    message: FINAL_MESSAGE.to_string(),
                },
            ],
            closing_message: CLOSING_MESSAGE.to_string(),
        }
    }
}

/// Acknowledgement state for one user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AckState {
    /// Text of the reminder the user is being nudged about
    pub last_prompt: String,
    /// True while awaiting a reply or mid-escalation
    pub active: bool,
    /// Bumped on every arm; escalations only act for the generation that spawned them
    generation: u64,
}

impl AckState {
    pub fn phase(&self) -> AckPhase {
        if self.active {
            AckPhase::AwaitingReply
        } else {
            AckPhase::Idle
        }
    }
}

type StateSlot = Arc<Mutex<AckState>>;

/// Acknowledgement state machine for all users
pub struct FollowUpTracker {
    states: DashMap<UserId, StateSlot>,
    policy: EscalationPolicy,
    gateway: Arc<dyn MessageGateway>,
}

impl FollowUpTracker {
    pub fn new(gateway: Arc<dyn MessageGateway>, policy: EscalationPolicy) -> Self {
        Self {
            states: DashMap::new(),
            policy,
            gateway,
        }
    }

    pub fn policy(&self) -> &EscalationPolicy {
        &self.policy
    }

    /// Get or create the state slot for a user.
    /// The DashMap guard is released before returning so it is never held across an await.
    fn slot(&self, user_id: UserId) -> StateSlot {
        self.states.entry(user_id).or_default().value().clone()
    }

    fn existing_slot(&self, user_id: UserId) -> Option<StateSlot> {
        self.states.get(&user_id).map(|entry| entry.value().clone())
    }

    /// Start awaiting a reply about `prompt` and schedule the escalation steps
    pub async fn arm(&self, user_id: UserId, prompt: &str) {
        let armed_at = Instant::now();
        let slot = self.slot(user_id);

        let generation = {
            let mut state = slot.lock().await;
            state.generation += 1;
            state.active = true;
            state.last_prompt = prompt.to_string();
            state.generation
        };

        info!(
            "🔔 Awaiting reply from user {user_id} about \"{prompt}\" ({} follow-ups armed)",
            self.policy.steps.len()
        );

        let last = self.policy.steps.len() - 1;
        for (index, step) in self.policy.steps.iter().enumerate() {
            let slot = slot.clone();
            let gateway = self.gateway.clone();
            let step = step.clone();
            let is_final = index == last;

            tokio::spawn(async move {
                sleep_until(armed_at + step.delay).await;
                escalate(slot, gateway, user_id, generation, &step, is_final).await;
            });
        }
    }

    /// Feed an inbound user message to the state machine
    ///
    /// Returns the closing acknowledgement when the message was consumed as a
    /// reply to a reminder; `None` means the message should be handled normally.
    pub async fn on_user_message(&self, user_id: UserId) -> Option<String> {
        let slot = self.existing_slot(user_id)?;
        let mut state = slot.lock().await;

        if !state.active {
            return None;
        }

        state.active = false;
        info!(
            "✅ User {user_id} acknowledged \"{}\"",
            state.last_prompt
        );
        Some(self.policy.closing_message.clone())
    }

    pub async fn phase(&self, user_id: UserId) -> AckPhase {
        match self.existing_slot(user_id) {
            Some(slot) => slot.lock().await.phase(),
            None => AckPhase::Idle,
        }
    }

    pub async fn snapshot(&self, user_id: UserId) -> Option<AckState> {
        let slot = self.existing_slot(user_id)?;
        let state = slot.lock().await;
        Some(state.clone())
    }
}

/// Fire one escalation step. Check-before-act under the user's lock.
async fn escalate(
    slot: StateSlot,
    gateway: Arc<dyn MessageGateway>,
    user_id: UserId,
    generation: u64,
    step: &EscalationStep,
    is_final: bool,
) {
    let mut state = slot.lock().await;

    if !state.active || state.generation != generation {
        debug!("Skipping follow-up for user {user_id}: no longer awaiting this reply");
        return;
    }

    if let Err(e) = gateway.send(user_id, &step.message).await {
        warn!("⚠️ Failed to send follow-up to user {user_id}: {e:#}");
    }

    if is_final {
        state.active = false;
        info!(
            "☑️ Closed follow-ups for user {user_id} about \"{}\" without a reply",
            state.last_prompt
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGateway;
    use tokio::time::sleep;

    fn fast_policy() -> EscalationPolicy {
        EscalationPolicy::from_delays([
            Duration::from_millis(60),
            Duration::from_millis(120),
            Duration::from_millis(180),
        ])
        .unwrap()
    }

    fn tracker(gateway: &Arc<RecordingGateway>) -> FollowUpTracker {
        FollowUpTracker::new(gateway.clone(), fast_policy())
    }

    #[test]
    fn test_default_policy_matches_documented_schedule() {
        let policy = EscalationPolicy::default();
        let minutes: Vec<u64> = policy.steps().iter().map(|s| s.delay.as_secs() / 60).collect();

        assert_eq!(minutes, vec![7, 25, 60]);
        assert!(policy.steps().last().unwrap().message.contains("☑️"));
    }

    #[test]
    fn test_policy_requires_a_step() {
        assert!(EscalationPolicy::from_minutes(&[]).is_none());
        assert!(EscalationPolicy::new(vec![], "done").is_none());

        let single = EscalationPolicy::from_minutes(&[10]).unwrap();
        assert_eq!(single.steps().len(), 1);
        assert_eq!(single.steps()[0].message, FINAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_unknown_user_is_idle() {
        let gateway = Arc::new(RecordingGateway::default());
        let tracker = tracker(&gateway);

        assert_eq!(tracker.phase(7).await, AckPhase::Idle);
        assert_eq!(tracker.on_user_message(7).await, None);
    }

    #[tokio::test]
    async fn test_arm_enters_awaiting_reply() {
        let gateway = Arc::new(RecordingGateway::default());
        let tracker = tracker(&gateway);

        tracker.arm(1, "drink water").await;

        let state = tracker.snapshot(1).await.unwrap();
        assert_eq!(state.phase(), AckPhase::AwaitingReply);
        assert_eq!(state.last_prompt, "drink water");
    }

    #[tokio::test]
    async fn test_reply_before_first_escalation_suppresses_nudges() {
        let gateway = Arc::new(RecordingGateway::default());
        let tracker = tracker(&gateway);

        tracker.arm(1, "drink water").await;
        let reply = tracker.on_user_message(1).await;

        assert_eq!(reply.as_deref(), Some(CLOSING_MESSAGE));
        assert_eq!(tracker.phase(1).await, AckPhase::Idle);

        sleep(Duration::from_millis(300)).await;
        assert!(gateway.sent_to(1).is_empty());
    }

    #[tokio::test]
    async fn test_escalations_run_to_completion_without_reply() {
        let gateway = Arc::new(RecordingGateway::default());
        let tracker = tracker(&gateway);

        tracker.arm(1, "drink water").await;

        sleep(Duration::from_millis(90)).await;
        assert_eq!(gateway.sent_to(1), vec![NUDGE_MESSAGES[0].to_string()]);
        assert_eq!(tracker.phase(1).await, AckPhase::AwaitingReply);

        sleep(Duration::from_millis(210)).await;
        assert_eq!(
            gateway.sent_to(1),
            vec![
                NUDGE_MESSAGES[0].to_string(),
                NUDGE_MESSAGES[1].to_string(),
                FINAL_MESSAGE.to_string(),
            ]
        );
        // Loop closes on its own
        assert_eq!(tracker.phase(1).await, AckPhase::Idle);
        assert_eq!(tracker.on_user_message(1).await, None);
    }

    #[tokio::test]
    async fn test_reply_mid_escalation_stops_remaining_nudges() {
        let gateway = Arc::new(RecordingGateway::default());
        let tracker = tracker(&gateway);

        tracker.arm(1, "drink water").await;
        sleep(Duration::from_millis(90)).await;
        assert!(tracker.on_user_message(1).await.is_some());

        sleep(Duration::from_millis(210)).await;
        assert_eq!(gateway.sent_to(1).len(), 1);
    }

    #[tokio::test]
    async fn test_final_step_closes_loop_even_if_send_fails() {
        let gateway = Arc::new(RecordingGateway::default());
        gateway.set_failing(true);
        let tracker = tracker(&gateway);

        tracker.arm(1, "drink water").await;
        sleep(Duration::from_millis(300)).await;

        assert_eq!(tracker.phase(1).await, AckPhase::Idle);
    }

    #[tokio::test]
    async fn test_rearm_supersedes_previous_escalations() {
        let gateway = Arc::new(RecordingGateway::default());
        let policy = EscalationPolicy::from_delays([
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(300),
        ])
        .unwrap();
        let tracker = FollowUpTracker::new(gateway.clone(), policy);

        tracker.arm(1, "drink water").await;
        sleep(Duration::from_millis(150)).await;
        tracker.arm(1, "stretch").await;

        // First arm's second step is due now but belongs to a stale generation
        sleep(Duration::from_millis(75)).await;
        assert_eq!(gateway.sent_to(1).len(), 1);

        sleep(Duration::from_millis(325)).await;
        let sent = gateway.sent_to(1);
        assert_eq!(sent.len(), 4);
        assert_eq!(sent.last().unwrap(), FINAL_MESSAGE);
        assert_eq!(tracker.snapshot(1).await.unwrap().last_prompt, "stretch");
        assert_eq!(tracker.phase(1).await, AckPhase::Idle);
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let gateway = Arc::new(RecordingGateway::default());
        let tracker = tracker(&gateway);

        tracker.arm(1, "drink water").await;
        tracker.arm(2, "walk the dog").await;
        assert!(tracker.on_user_message(1).await.is_some());

        sleep(Duration::from_millis(90)).await;
        assert!(gateway.sent_to(1).is_empty());
        assert_eq!(gateway.sent_to(2).len(), 1);
        assert_eq!(tracker.phase(2).await, AckPhase::AwaitingReply);
    }

    #[tokio::test]
    async fn test_reply_waits_for_in_flight_nudge() {
        let gateway = Arc::new(RecordingGateway::default());
        gateway.set_send_delay(Duration::from_millis(100));
        let policy = EscalationPolicy::from_delays([
            Duration::from_millis(50),
            Duration::from_millis(250),
            Duration::from_millis(400),
        ])
        .unwrap();
        let tracker = FollowUpTracker::new(gateway.clone(), policy);

        tracker.arm(1, "drink water").await;

        // First nudge starts at 50ms and holds the user's lock until ~150ms
        sleep(Duration::from_millis(80)).await;
        assert_eq!(gateway.attempts(), 1);
        assert!(gateway.sent_to(1).is_empty());

        let started = Instant::now();
        let reply = tracker.on_user_message(1).await;

        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(reply.as_deref(), Some(CLOSING_MESSAGE));
        assert_eq!(gateway.sent_to(1), vec![NUDGE_MESSAGES[0].to_string()]);
        assert_eq!(tracker.phase(1).await, AckPhase::Idle);

        sleep(Duration::from_millis(450)).await;
        assert_eq!(gateway.attempts(), 1);
        assert_eq!(gateway.sent_to(1).len(), 1);
    }

    #[tokio::test]
    async fn test_slow_send_for_one_user_does_not_block_another() {
        let gateway = Arc::new(RecordingGateway::default());
        gateway.set_send_delay(Duration::from_millis(150));
        let policy = EscalationPolicy::from_delays([
            Duration::from_millis(50),
            Duration::from_millis(500),
            Duration::from_millis(600),
        ])
        .unwrap();
        let tracker = FollowUpTracker::new(gateway.clone(), policy);

        tracker.arm(1, "drink water").await;
        sleep(Duration::from_millis(80)).await;
        // User 1's nudge is mid-send and holds user 1's lock
        assert_eq!(gateway.attempts(), 1);

        tracker.arm(2, "walk the dog").await;
        let started = Instant::now();
        let reply = tracker.on_user_message(2).await;

        assert!(started.elapsed() < Duration::from_millis(50));
        assert_eq!(reply.as_deref(), Some(CLOSING_MESSAGE));
        assert!(gateway.sent_to(1).is_empty());
    }
}
