//! The "are you safe?" check state machine.
//!
//! ```text
//!   Pending ──confirm──▶ Confirmed   (terminal)
//!   Pending ──cancel───▶ Cancelled   (terminal)
//!   Pending ──deadline─▶ Escalated   (terminal)
//! ```
//!
//! A check resolves exactly once; any second transition attempt is an
//! [`TransitionError::AlreadyResolved`] error, which is how the protocol
//! rules out double-escalation and escalate-after-confirm races at the
//! type level rather than by timing.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::TriggerEvent;

/// Lifecycle state of one safety check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckState {
    /// Waiting for the user to answer the prompt.
    Pending,
    /// User confirmed they are safe.
    Confirmed,
    /// Grace window elapsed without confirmation.
    Escalated,
    /// User (or lifecycle teardown) dismissed the check.
    Cancelled,
}

impl CheckState {
    /// Whether this state is terminal.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A user's answer to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResponse {
    /// "Yes, I'm safe."
    Confirm,
    /// Dismiss the check without confirming.
    Cancel,
}

/// Terminal outcome of a resolved check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Confirmed before the deadline.
    Confirmed,
    /// Dismissed before the deadline.
    Cancelled,
    /// Deadline elapsed unanswered.
    Escalated,
}

impl From<CheckOutcome> for CheckState {
    fn from(outcome: CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Confirmed => Self::Confirmed,
            CheckOutcome::Cancelled => Self::Cancelled,
            CheckOutcome::Escalated => Self::Escalated,
        }
    }
}

/// Attempted transition on an already-resolved check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Safety check already resolved as {existing:?}")]
pub struct TransitionError {
    /// The terminal state the check is already in.
    pub existing: CheckState,
}

/// One timed safety check.
///
/// At most one check is Pending at a time per lifecycle; the engine drops
/// further triggers while one is live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyCheck {
    /// Unique check id, used to route user responses.
    pub id: Uuid,
    /// The trigger event that opened this check.
    pub trigger: TriggerEvent,
    /// Current state.
    pub state: CheckState,
    /// When the check opened (Unix epoch milliseconds).
    pub started_at_ms: i64,
    /// When the grace window elapses (Unix epoch milliseconds).
    pub deadline_ms: i64,
    /// Consecutive unconfirmed checks preceding this one in the session.
    pub unresolved_count: u32,
}

impl SafetyCheck {
    /// Open a new Pending check.
    #[must_use]
    pub fn open(
        trigger: TriggerEvent,
        started_at_ms: i64,
        grace_ms: i64,
        unresolved_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            state: CheckState::Pending,
            started_at_ms,
            deadline_ms: started_at_ms + grace_ms,
            unresolved_count,
        }
    }

    /// Move the check to a terminal state.
    ///
    /// Fails if the check already resolved; the first transition wins.
    pub fn resolve(&mut self, outcome: CheckOutcome) -> Result<(), TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError {
                existing: self.state,
            });
        }
        self.state = outcome.into();
        Ok(())
    }
}
