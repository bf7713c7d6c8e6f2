//! Emergency candidate events produced by the trigger sources.

use serde::{Deserialize, Serialize};

/// Which trigger source produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOrigin {
    /// Explicit user action (the SOS button).
    Manual,
    /// A spotted emergency keyword in the speech stream.
    Voice,
    /// An elapsed ride-monitoring check-in interval.
    PeriodicCheck,
}

/// Details of a voice keyword match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceMatch {
    /// BCP-47 tag of the language list the phrase came from.
    pub language: String,
    /// The configured phrase that matched the utterance.
    pub phrase: String,
}

/// One emergency candidate.
///
/// Created by a trigger source and consumed exactly once by the
/// confirmation protocol (or, for manual SOS, acted on directly).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    /// Source that produced this event.
    pub origin: TriggerOrigin,
    /// Detection time (Unix epoch milliseconds).
    pub detected_at_ms: i64,
    /// Present only for voice triggers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_match: Option<VoiceMatch>,
}

impl TriggerEvent {
    /// Create a manual SOS event.
    #[must_use]
    pub const fn manual(detected_at_ms: i64) -> Self {
        Self {
            origin: TriggerOrigin::Manual,
            detected_at_ms,
            voice_match: None,
        }
    }

    /// Create a voice keyword event.
    #[must_use]
    pub fn voice(detected_at_ms: i64, language: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            origin: TriggerOrigin::Voice,
            detected_at_ms,
            voice_match: Some(VoiceMatch {
                language: language.into(),
                phrase: phrase.into(),
            }),
        }
    }

    /// Create a periodic ride check-in event.
    #[must_use]
    pub const fn periodic_check(detected_at_ms: i64) -> Self {
        Self {
            origin: TriggerOrigin::PeriodicCheck,
            detected_at_ms,
            voice_match: None,
        }
    }
}
