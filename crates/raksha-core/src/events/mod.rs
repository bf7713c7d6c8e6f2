//! Canonical event union for everything the engine tells the UI layer.
//!
//! This module is the single source of truth for events consumed by the
//! embedding application (toast prompts, status chips, delivery banners).
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "alert_delivered", "kind": "sos", "delivered": 3, "failed": 0 }
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{CheckOutcome, EscalationKind, RideSession, SafetyCheck, TriggerOrigin};

/// Observable state of the voice detection watcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VoiceWatchState {
    /// Not started, or stopped by the user.
    Inactive,
    /// Actively listening in one language.
    Listening {
        /// BCP-47 tag of the active recognition language.
        language: String,
    },
    /// No recognition capability exists on this platform.
    Unsupported,
    /// Microphone permission was denied; detection is disabled.
    PermissionDenied,
}

/// Canonical event types pushed through the [`EngineEventEmitter`] port.
///
/// Each variant carries all context needed to be self-describing, so the
/// UI layer never has to query engine state to render a prompt or banner.
///
/// [`EngineEventEmitter`]: crate::ports::EngineEventEmitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    // ========== SOS lifecycle ==========
    /// Manual SOS started: the hotline dial was raised and live location
    /// sharing is running.
    SosStarted,

    /// Manual SOS stopped by the user.
    SosStopped,

    // ========== Escalation delivery ==========
    /// One fan-out completed ("location sent to N contacts").
    AlertDelivered {
        /// Which flow escalated.
        kind: EscalationKind,
        /// Contacts successfully notified.
        delivered: u32,
        /// Contacts whose delivery failed.
        failed: u32,
        /// Text delivery is unsupported on this platform (single aggregate
        /// notice; per-contact outcomes are suppressed).
        unsupported: bool,
    },

    // ========== Safety checks ==========
    /// A safety check opened; the UI should prompt "are you safe?".
    SafetyCheckPrompt {
        /// The full pending check, including its deadline.
        check: SafetyCheck,
    },

    /// A safety check reached its terminal state.
    SafetyCheckResolved {
        /// Id of the resolved check.
        #[serde(rename = "checkId")]
        check_id: Uuid,
        /// How it resolved.
        outcome: CheckOutcome,
    },

    /// A trigger fired while a check was already pending and was dropped.
    ///
    /// Diagnostic only — not a user-facing error.
    TriggerIgnored {
        /// Origin of the dropped trigger.
        origin: TriggerOrigin,
    },

    // ========== Voice detection ==========
    /// The voice watcher changed state (language rotation, disable).
    VoiceWatchChanged {
        /// New watcher state.
        state: VoiceWatchState,
    },

    // ========== Ride monitoring ==========
    /// Ride monitoring started.
    RideStarted {
        /// The new active session.
        session: RideSession,
    },

    /// Ride monitoring stopped normally.
    RideCompleted {
        /// Id of the completed session.
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },

    /// Ride monitoring escalated to an emergency.
    RideEmergency {
        /// Id of the escalated session.
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },

    // ========== Sensor degradation ==========
    /// Location is unavailable for the active lifecycle (surfaced once).
    LocationUnavailable {
        /// Human-readable reason ("could not access location").
        reason: String,
    },
}

impl EngineEvent {
    /// Serialize to the wire JSON shape.
    ///
    /// Infallible for this enum; adapters push the value straight to their
    /// transport (SSE, webview bridge, log line).
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Get the event name for wire protocols.
    ///
    /// Stable names for frontend subscriptions, independent of the serde
    /// representation.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::SosStarted => "sos:started",
            Self::SosStopped => "sos:stopped",
            Self::AlertDelivered { .. } => "alert:delivered",
            Self::SafetyCheckPrompt { .. } => "check:prompt",
            Self::SafetyCheckResolved { .. } => "check:resolved",
            Self::TriggerIgnored { .. } => "trigger:ignored",
            Self::VoiceWatchChanged { .. } => "voice:state_changed",
            Self::RideStarted { .. } => "ride:started",
            Self::RideCompleted { .. } => "ride:completed",
            Self::RideEmergency { .. } => "ride:emergency",
            Self::LocationUnavailable { .. } => "location:unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TriggerEvent;

    #[test]
    fn serializes_with_type_tag() {
        let event = EngineEvent::AlertDelivered {
            kind: EscalationKind::Sos,
            delivered: 3,
            failed: 1,
            unsupported: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"alert_delivered\""));
        assert!(json.contains("\"delivered\":3"));
    }

    #[test]
    fn prompt_event_carries_deadline() {
        let check = SafetyCheck::open(TriggerEvent::periodic_check(1_000), 1_000, 50_000, 2);
        let event = EngineEvent::SafetyCheckPrompt { check };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"deadlineMs\":51000"));
        assert!(json.contains("\"unresolvedCount\":2"));
    }

    /// Lock down event names to prevent frontend subscription mismatches.
    #[test]
    fn event_names_are_stable() {
        let cases = vec![
            (EngineEvent::SosStarted, "sos:started"),
            (EngineEvent::SosStopped, "sos:stopped"),
            (
                EngineEvent::TriggerIgnored {
                    origin: TriggerOrigin::Voice,
                },
                "trigger:ignored",
            ),
            (
                EngineEvent::VoiceWatchChanged {
                    state: VoiceWatchState::Unsupported,
                },
                "voice:state_changed",
            ),
            (
                EngineEvent::LocationUnavailable {
                    reason: "could not access location".to_string(),
                },
                "location:unavailable",
            ),
        ];

        for (event, expected_name) in cases {
            assert_eq!(event.event_name(), expected_name);
        }
    }
}
