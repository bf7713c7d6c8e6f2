//! Escalation message composition.

use serde::{Deserialize, Serialize};

use super::{Position, TrustedContact};

/// Which flow produced the escalation, which drives the message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationKind {
    /// Manual SOS button.
    Sos,
    /// Voice keyword detection that went unconfirmed.
    VoiceDetected,
    /// Ride check-ins that went unanswered.
    RideUnresponsive,
}

/// One outgoing escalation: the text body, the recipients, and the hotline
/// to dial. Composed fresh per escalation and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationMessage {
    /// Human-readable body with an embedded map link.
    pub body: String,
    /// Snapshot of the trusted contacts to notify.
    pub contacts: Vec<TrustedContact>,
    /// The emergency hotline number to dial.
    pub dial_target: String,
}

impl EscalationMessage {
    /// Compose a message for the given flow.
    ///
    /// A missing position renders a "location unavailable" line rather than
    /// suppressing the message; the dial-and-notify flow never waits on a
    /// fix that may not come.
    #[must_use]
    pub fn compose(
        kind: EscalationKind,
        position: Option<&Position>,
        contacts: Vec<TrustedContact>,
        dial_target: impl Into<String>,
        now_ms: i64,
    ) -> Self {
        let time = chrono::DateTime::from_timestamp_millis(now_ms)
            .unwrap_or_default()
            .format("%H:%M:%S UTC");

        let body = match kind {
            EscalationKind::Sos => format!(
                "🚨 EMERGENCY SOS 🚨\nI need help immediately!\n📍 My location: {}\n⏰ Sent: {time}",
                position.map_or_else(location_unavailable, Position::osm_link),
            ),
            EscalationKind::VoiceDetected => format!(
                "🚨 VOICE EMERGENCY DETECTED 🚨\nHelp may be needed immediately!\n📍 Location: {}\n⏰ Detected: {time}",
                position.map_or_else(location_unavailable, Position::maps_link),
            ),
            EscalationKind::RideUnresponsive => format!(
                "🚨 RIDE SAFETY ALERT 🚨\nRepeated safety checks went unanswered during a monitored ride.\n📍 Last known location: {}\n⏰ Raised: {time}",
                position.map_or_else(location_unavailable, Position::maps_link),
            ),
        };

        Self {
            body,
            contacts,
            dial_target: dial_target.into(),
        }
    }
}

fn location_unavailable() -> String {
    "unavailable".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sos_body_carries_osm_link_and_time() {
        let pos = Position::new(17.385, 78.4867, 0);
        let msg = EscalationMessage::compose(EscalationKind::Sos, Some(&pos), vec![], "100", 0);
        assert!(msg.body.contains("EMERGENCY SOS"));
        assert!(msg.body.contains("openstreetmap.org/?mlat=17.385"));
        assert!(msg.body.contains("Sent: 00:00:00 UTC"));
        assert_eq!(msg.dial_target, "100");
    }

    #[test]
    fn voice_body_uses_maps_link() {
        let pos = Position::new(1.0, 2.0, 0);
        let msg =
            EscalationMessage::compose(EscalationKind::VoiceDetected, Some(&pos), vec![], "100", 0);
        assert!(msg.body.contains("VOICE EMERGENCY DETECTED"));
        assert!(msg.body.contains("google.com/maps?q=1,2"));
    }

    #[test]
    fn missing_position_never_suppresses_the_message() {
        let msg =
            EscalationMessage::compose(EscalationKind::RideUnresponsive, None, vec![], "100", 0);
        assert!(msg.body.contains("Last known location: unavailable"));
    }
}
