//! Ride-monitoring sessions and the audit-log row shape.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a monitored ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    /// Monitoring is running and periodic checks fire.
    Active,
    /// The user stopped monitoring normally.
    Completed,
    /// The ride escalated to an emergency.
    Emergency,
}

/// One monitored ride.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideSession {
    /// Unique session id.
    pub id: Uuid,
    /// Destination as entered by the user.
    pub destination: String,
    /// Vehicle registration (e.g. `MH02AB1234`).
    pub vehicle_number: String,
    /// Driver/vehicle contact number (10 digits).
    pub contact_phone: String,
    /// Session start (Unix epoch milliseconds).
    pub started_at_ms: i64,
    /// Current status.
    pub status: RideStatus,
}

impl RideSession {
    /// Start a new active session.
    #[must_use]
    pub fn start(
        destination: impl Into<String>,
        vehicle_number: impl Into<String>,
        contact_phone: impl Into<String>,
        started_at_ms: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination: destination.into(),
            vehicle_number: vehicle_number.into(),
            contact_phone: contact_phone.into(),
            started_at_ms,
            status: RideStatus::Active,
        }
    }
}

/// Row shape for the external ride audit sink.
///
/// Mirrors the spreadsheet columns the audit backend expects
/// (`id, from, to, vehicleNumber, phoneNumber, timestamp, status`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideLogEntry {
    /// Session id.
    pub id: Uuid,
    /// Starting point, if known ("from" column).
    #[serde(rename = "from")]
    pub origin: Option<String>,
    /// Destination ("to" column).
    #[serde(rename = "to")]
    pub destination: String,
    /// Vehicle registration.
    pub vehicle_number: String,
    /// Driver/vehicle contact number.
    pub phone_number: String,
    /// Session start as an ISO-8601 timestamp.
    pub timestamp: String,
    /// Status at the time of writing.
    pub status: RideStatus,
}

impl RideLogEntry {
    /// Build the audit row for a session.
    #[must_use]
    pub fn from_session(session: &RideSession, origin: Option<String>) -> Self {
        let timestamp = chrono::DateTime::from_timestamp_millis(session.started_at_ms)
            .unwrap_or_default()
            .to_rfc3339();
        Self {
            id: session.id,
            origin,
            destination: session.destination.clone(),
            vehicle_number: session.vehicle_number.clone(),
            phone_number: session.contact_phone.clone(),
            timestamp,
            status: session.status,
        }
    }
}

/// Validate an Indian vehicle registration number.
///
/// Shape: two letters (state), one or two digits (district), one or two
/// letters (series), four digits — `MH02AB1234`, `TS9A0001`.
#[must_use]
pub fn validate_vehicle_number(raw: &str) -> bool {
    let chars: Vec<char> = raw.chars().collect();
    if !(8..=10).contains(&chars.len()) {
        return false;
    }

    let letters = |slice: &[char]| slice.iter().all(char::is_ascii_uppercase);
    let digits = |slice: &[char]| slice.iter().all(char::is_ascii_digit);

    if !letters(&chars[..2]) {
        return false;
    }
    // The tail is always 4 digits; the district code (1-2 digits) and
    // series (1-2 letters) share whatever sits between.
    let tail = &chars[chars.len() - 4..];
    if !digits(tail) {
        return false;
    }
    let middle = &chars[2..chars.len() - 4];
    match middle.len() {
        2 => digits(&middle[..1]) && letters(&middle[1..]),
        3 => {
            (digits(&middle[..1]) && letters(&middle[1..]))
                || (digits(&middle[..2]) && letters(&middle[2..]))
        }
        4 => digits(&middle[..2]) && letters(&middle[2..]),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_active() {
        let ride = RideSession::start("MG Road, Bengaluru", "KA01AB1234", "9876543210", 1_000);
        assert_eq!(ride.status, RideStatus::Active);
        assert_eq!(ride.started_at_ms, 1_000);
    }

    #[test]
    fn accepts_standard_plates() {
        assert!(validate_vehicle_number("MH02AB1234"));
        assert!(validate_vehicle_number("KA1AB1234"));
        assert!(validate_vehicle_number("TS09A0001"));
        assert!(validate_vehicle_number("DL12C4567"));
    }

    #[test]
    fn rejects_malformed_plates() {
        assert!(!validate_vehicle_number(""));
        assert!(!validate_vehicle_number("mh02ab1234"));
        assert!(!validate_vehicle_number("M102AB1234"));
        assert!(!validate_vehicle_number("MH02AB123"));
        assert!(!validate_vehicle_number("MH02AB12345"));
        assert!(!validate_vehicle_number("MHXXAB1234"));
    }

    #[test]
    fn log_entry_uses_sheet_column_names() {
        let ride = RideSession::start("Airport", "MH02AB1234", "9876543210", 0);
        let entry = RideLogEntry::from_session(&ride, Some("Home".to_string()));
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"from\":\"Home\""));
        assert!(json.contains("\"to\":\"Airport\""));
        assert!(json.contains("\"vehicleNumber\":\"MH02AB1234\""));
        assert!(json.contains("\"status\":\"active\""));
    }
}
