//! Outbound delivery port (SMS-like text plus hotline dialing).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the delivery channel.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyError {
    /// No text-message transport exists on this platform.
    #[error("Text delivery not supported on this platform")]
    Unsupported,

    /// Delivery to one recipient failed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// The dial intent could not be raised.
    #[error("Dial failed: {0}")]
    DialFailed(String),
}

/// Port for emergency delivery actions.
///
/// Real transports (native SMS plugin, telephony intents) are wired by the
/// embedding application; the engine only ever sees this trait.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether a text transport exists at all.
    ///
    /// Queried once per fan-out so an unsupported platform produces a
    /// single aggregate notice instead of one failure per contact.
    fn can_send_text(&self) -> bool;

    /// Deliver one text message to one recipient.
    async fn send_text(&self, phone_number: &str, body: &str) -> Result<(), NotifyError>;

    /// Raise the dial intent for the given number.
    ///
    /// Fire-and-forget: the engine never waits on call setup and a failure
    /// here must never block anything else.
    async fn dial(&self, number: &str) -> Result<(), NotifyError>;
}
