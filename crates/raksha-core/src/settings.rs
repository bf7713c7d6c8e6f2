//! Engine settings and validation.
//!
//! All timing knobs live here rather than as constants: grace windows,
//! check intervals, and rate limits differ between demo and production
//! deployments and must be configurable without touching engine code.

use serde::{Deserialize, Serialize};

/// Default emergency hotline (police short code).
pub const DEFAULT_HOTLINE: &str = "100";

/// Default minimum gap between live-location fan-outs during an SOS.
pub const DEFAULT_NOTIFY_MIN_INTERVAL_SECS: u64 = 30;

/// Default grace window for voice/manual safety checks.
pub const DEFAULT_VOICE_GRACE_SECS: u64 = 60;

/// Default grace window for periodic ride checks.
pub const DEFAULT_RIDE_GRACE_SECS: u64 = 50;

/// Default gap between periodic ride checks.
pub const DEFAULT_RIDE_CHECK_INTERVAL_SECS: u64 = 600;

/// Default consecutive-unconfirmed-checks threshold before a ride escalates.
pub const DEFAULT_RIDE_UNRESOLVED_THRESHOLD: u32 = 3;

/// Default cadence of the single-shot poll that backs up the location watch.
pub const DEFAULT_LOCATION_POLL_SECS: u64 = 3;

/// Default delay before restarting recognition after a stream ends.
pub const DEFAULT_SPEECH_RESTART_DELAY_MS: u64 = 1_000;

/// Emergency phrases for one recognition language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageKeywords {
    /// BCP-47 language tag.
    pub language: String,
    /// Phrases matched case-insensitively as substrings of an utterance.
    pub phrases: Vec<String>,
}

impl LanguageKeywords {
    /// Build an entry from string slices.
    #[must_use]
    pub fn new(language: &str, phrases: &[&str]) -> Self {
        Self {
            language: language.to_string(),
            phrases: phrases.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Emergency hotline number dialed on every escalation.
    pub hotline: String,

    /// Minimum seconds between live-location fan-outs during an SOS.
    pub notify_min_interval_secs: u64,

    /// Grace window for voice-triggered safety checks, in seconds.
    pub voice_grace_secs: u64,

    /// Grace window for periodic ride checks, in seconds.
    pub ride_grace_secs: u64,

    /// Gap between periodic ride checks, in seconds.
    pub ride_check_interval_secs: u64,

    /// Consecutive unconfirmed ride checks before the ride escalates.
    pub ride_unresolved_threshold: u32,

    /// Cadence of the poll fallback merged into the location watch.
    pub location_poll_secs: u64,

    /// Delay before restarting recognition after a stream stop or error.
    pub speech_restart_delay_ms: u64,

    /// Recognition languages in rotation order, with their trigger phrases.
    pub keywords: Vec<LanguageKeywords>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            hotline: DEFAULT_HOTLINE.to_string(),
            notify_min_interval_secs: DEFAULT_NOTIFY_MIN_INTERVAL_SECS,
            voice_grace_secs: DEFAULT_VOICE_GRACE_SECS,
            ride_grace_secs: DEFAULT_RIDE_GRACE_SECS,
            ride_check_interval_secs: DEFAULT_RIDE_CHECK_INTERVAL_SECS,
            ride_unresolved_threshold: DEFAULT_RIDE_UNRESOLVED_THRESHOLD,
            location_poll_secs: DEFAULT_LOCATION_POLL_SECS,
            speech_restart_delay_ms: DEFAULT_SPEECH_RESTART_DELAY_MS,
            keywords: default_keywords(),
        }
    }
}

/// The stock multi-language emergency phrase table.
#[must_use]
pub fn default_keywords() -> Vec<LanguageKeywords> {
    vec![
        LanguageKeywords::new("en-US", &["help", "emergency", "sos", "danger"]),
        LanguageKeywords::new("hi-IN", &["मदद", "बचाओ", "बचाव", "खतरा"]),
        LanguageKeywords::new("te-IN", &["సాయం", "సహాయం", "కాపాడండి"]),
        LanguageKeywords::new("ta-IN", &["உதவி", "காப்பாற்று"]),
        LanguageKeywords::new("mr-IN", &["मदत", "बचाव"]),
        LanguageKeywords::new("bn-IN", &["সাহায্য", "বাঁচাও"]),
    ]
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Hotline must be a non-empty digit string, got {0:?}")]
    InvalidHotline(String),

    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("Ride unresolved threshold must be at least 1, got {0}")]
    InvalidThreshold(u32),

    #[error("At least one recognition language with at least one phrase is required")]
    EmptyKeywords,
}

/// Validate settings values.
pub fn validate_settings(settings: &EngineSettings) -> Result<(), SettingsError> {
    if settings.hotline.is_empty() || !settings.hotline.chars().all(|c| c.is_ascii_digit()) {
        return Err(SettingsError::InvalidHotline(settings.hotline.clone()));
    }

    for (name, value) in [
        ("notify_min_interval_secs", settings.notify_min_interval_secs),
        ("voice_grace_secs", settings.voice_grace_secs),
        ("ride_grace_secs", settings.ride_grace_secs),
        ("ride_check_interval_secs", settings.ride_check_interval_secs),
        ("location_poll_secs", settings.location_poll_secs),
    ] {
        if value == 0 {
            return Err(SettingsError::ZeroInterval(name));
        }
    }

    if settings.ride_unresolved_threshold == 0 {
        return Err(SettingsError::InvalidThreshold(0));
    }

    if settings
        .keywords
        .iter()
        .all(|entry| entry.phrases.is_empty())
    {
        return Err(SettingsError::EmptyKeywords);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.hotline, DEFAULT_HOTLINE);
        assert_eq!(settings.ride_check_interval_secs, 600);
        assert_eq!(settings.ride_unresolved_threshold, 3);
        assert_eq!(settings.keywords.len(), 6);
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_validate_hotline() {
        let settings = EngineSettings {
            hotline: "tel:100".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidHotline(_))
        ));

        let settings = EngineSettings {
            hotline: String::new(),
            ..Default::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_validate_zero_interval() {
        let settings = EngineSettings {
            location_poll_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::ZeroInterval("location_poll_secs"))
        ));
    }

    #[test]
    fn test_validate_threshold() {
        let settings = EngineSettings {
            ride_unresolved_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidThreshold(0))
        ));
    }

    #[test]
    fn test_long_production_grace_is_accepted() {
        // Multi-hour grace windows are a deliberate deployment choice;
        // ticks landing while a check is pending are dropped, not queued.
        let settings = EngineSettings {
            ride_grace_secs: 18_000,
            ..Default::default()
        };
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_empty_keywords_rejected() {
        let settings = EngineSettings {
            keywords: vec![LanguageKeywords::new("en-US", &[])],
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyKeywords)
        ));
    }

    #[test]
    fn test_settings_roundtrip_camel_case() {
        let settings = EngineSettings::default();
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"rideCheckIntervalSecs\":600"));
        let back: EngineSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
