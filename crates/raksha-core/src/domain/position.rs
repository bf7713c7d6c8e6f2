//! Position samples produced by the location subsystem.

use serde::{Deserialize, Serialize};

/// One location fix.
///
/// Immutable once produced; a newer sample supersedes an older one and the
/// core keeps no history. Timestamps are Unix epoch milliseconds as reported
/// by the platform provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Horizontal accuracy radius in meters, if the provider reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    /// Altitude in meters above the WGS-84 ellipsoid, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude_m: Option<f64>,
    /// Ground speed in meters per second, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
    /// When the sample was captured (Unix epoch milliseconds).
    pub captured_at_ms: i64,
}

impl Position {
    /// Create a bare fix with no optional channels.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, captured_at_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
            altitude_m: None,
            speed_mps: None,
            captured_at_ms,
        }
    }

    /// Whether this sample is strictly newer than `other`.
    ///
    /// The merge layer uses this to guarantee the consumer-visible current
    /// position never regresses: a late-arriving lower-timestamp sample
    /// loses against whatever is already held.
    #[must_use]
    pub const fn supersedes(&self, other: &Self) -> bool {
        self.captured_at_ms > other.captured_at_ms
    }

    /// OpenStreetMap link centered on this fix (used in SOS messages).
    #[must_use]
    pub fn osm_link(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={}&mlon={}&zoom=16",
            self.latitude, self.longitude
        )
    }

    /// Google Maps link for this fix (used in voice-detection messages).
    #[must_use]
    pub fn maps_link(&self) -> String {
        format!(
            "https://www.google.com/maps?q={},{}",
            self.latitude, self.longitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_sample_supersedes_older() {
        let older = Position::new(17.385, 78.4867, 3_000);
        let newer = Position::new(17.386, 78.4870, 5_000);
        assert!(newer.supersedes(&older));
        assert!(!older.supersedes(&newer));
        // Equal timestamps: neither wins, first writer is kept.
        assert!(!older.supersedes(&older.clone()));
    }

    #[test]
    fn map_links_embed_coordinates() {
        let pos = Position::new(17.385, 78.4867, 0);
        assert_eq!(
            pos.osm_link(),
            "https://www.openstreetmap.org/?mlat=17.385&mlon=78.4867&zoom=16"
        );
        assert_eq!(pos.maps_link(), "https://www.google.com/maps?q=17.385,78.4867");
    }

    #[test]
    fn serializes_camel_case_and_skips_empty_optionals() {
        let pos = Position::new(1.0, 2.0, 42);
        let json = serde_json::to_string(&pos).unwrap();
        assert!(json.contains("\"capturedAtMs\":42"));
        assert!(!json.contains("accuracyM"));
    }
}
