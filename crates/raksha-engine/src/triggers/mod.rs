//! Trigger sources: the three producers of emergency candidates.
//!
//! - [`ManualTrigger`] — the SOS button, a synchronous fire.
//! - [`VoiceTrigger`] — keyword spotting over the speech stream, rotating
//!   through the configured languages.
//! - [`PeriodicCheckTrigger`] — the ride-monitoring check-in timer.
//!
//! All three produce the same [`TriggerEvent`] currency, so the
//! confirmation protocol and the engine treat them uniformly.

mod periodic;
mod voice;

use std::sync::Arc;

use raksha_core::domain::{TriggerEvent, VoiceMatch};
use raksha_core::ports::Clock;
use raksha_core::settings::LanguageKeywords;

pub use periodic::PeriodicCheckTrigger;
pub use voice::{VoiceTrigger, VoiceTriggerConfig, VoiceTriggerHandle};

/// The SOS button.
#[derive(Clone)]
pub struct ManualTrigger {
    clock: Arc<dyn Clock>,
}

impl ManualTrigger {
    /// Create a manual trigger.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Produce one emergency candidate for an explicit user action.
    #[must_use]
    pub fn fire(&self) -> TriggerEvent {
        TriggerEvent::manual(self.clock.now_ms())
    }
}

/// Match an utterance against every configured language's phrase list.
///
/// Case-insensitive substring match, the whole table checked regardless of
/// which language the recognizer is currently running — a Hindi phrase in
/// an English recognition session still counts.
#[must_use]
pub(crate) fn match_keywords(table: &[LanguageKeywords], utterance: &str) -> Option<VoiceMatch> {
    let lowered = utterance.to_lowercase();
    for entry in table {
        for phrase in &entry.phrases {
            if lowered.contains(&phrase.to_lowercase()) {
                return Some(VoiceMatch {
                    language: entry.language.clone(),
                    phrase: phrase.clone(),
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use raksha_core::domain::TriggerOrigin;
    use raksha_core::settings::default_keywords;
    use raksha_core::stubs::FixedClock;

    #[test]
    fn manual_trigger_stamps_the_clock() {
        let trigger = ManualTrigger::new(Arc::new(FixedClock::at(42_000)));
        let event = trigger.fire();
        assert_eq!(event.origin, TriggerOrigin::Manual);
        assert_eq!(event.detected_at_ms, 42_000);
    }

    #[test]
    fn matches_case_insensitive_substring() {
        let table = default_keywords();
        let hit = match_keywords(&table, "Please HELP me now").unwrap();
        assert_eq!(hit.language, "en-US");
        assert_eq!(hit.phrase, "help");
    }

    #[test]
    fn matches_any_configured_language() {
        let table = default_keywords();
        let hit = match_keywords(&table, "कोई बचाओ").unwrap();
        assert_eq!(hit.language, "hi-IN");

        let hit = match_keywords(&table, "దయచేసి సాయం చేయండి").unwrap();
        assert_eq!(hit.language, "te-IN");
    }

    #[test]
    fn no_match_for_ordinary_speech() {
        let table = default_keywords();
        assert!(match_keywords(&table, "turn left at the signal").is_none());
    }
}
