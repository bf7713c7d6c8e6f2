//! Trusted contacts and phone number normalization.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A person who receives emergency notifications.
///
/// Owned by the external contact store; the engine only ever holds a
/// read-only snapshot taken at the moment of escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedContact {
    /// Opaque, stable identifier assigned by the contact store.
    pub id: String,
    /// Human-readable name shown in delivery reports.
    pub display_name: String,
    /// Normalized 10-digit local subscriber number.
    pub phone_number: String,
}

impl TrustedContact {
    /// Build a contact, normalizing the phone number.
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        phone: &str,
    ) -> Result<Self, ContactValidationError> {
        Ok(Self {
            id: id.into(),
            display_name: display_name.into(),
            phone_number: normalize_phone(phone)?,
        })
    }

    /// Whether two raw numbers identify the same subscriber.
    #[must_use]
    pub fn same_number(a: &str, b: &str) -> bool {
        match (normalize_phone(a), normalize_phone(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Invalid contact input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactValidationError {
    /// The number does not reduce to 10 digits.
    #[error("Phone number must be 10 digits, got {0:?}")]
    InvalidPhone(String),
}

/// Normalize a raw phone number to the 10-digit local subscriber form.
///
/// Strips every non-digit, then a single leading `0` trunk prefix or `91`
/// country code. Anything that does not land on exactly 10 digits is
/// rejected rather than guessed at.
pub fn normalize_phone(raw: &str) -> Result<String, ContactValidationError> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

    let local = if digits.len() == 12 && digits.starts_with("91") {
        &digits[2..]
    } else if digits.len() == 11 && digits.starts_with('0') {
        &digits[1..]
    } else {
        digits.as_str()
    };

    if local.len() == 10 {
        Ok(local.to_string())
    } else {
        Err(ContactValidationError::InvalidPhone(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_formatting_and_prefixes() {
        assert_eq!(normalize_phone("98765 43210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("+91 98765-43210").unwrap(), "9876543210");
        assert_eq!(normalize_phone("09876543210").unwrap(), "9876543210");
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(normalize_phone("12345").is_err());
        assert!(normalize_phone("987654321012").is_err());
        assert!(normalize_phone("").is_err());
    }

    #[test]
    fn same_number_compares_normalized_digits() {
        assert!(TrustedContact::same_number("+919876543210", "98765 43210"));
        assert!(!TrustedContact::same_number("9876543210", "8765432109"));
        assert!(!TrustedContact::same_number("bad", "9876543210"));
    }

    #[test]
    fn contact_constructor_normalizes() {
        let c = TrustedContact::new("c1", "Asha", "+91 98765 43210").unwrap();
        assert_eq!(c.phone_number, "9876543210");
        assert!(TrustedContact::new("c2", "Bad", "123").is_err());
    }
}
