//! Engine-level error type.

use thiserror::Error;
use uuid::Uuid;

use raksha_core::ports::{ContactStoreError, LocationError};
use raksha_core::settings::SettingsError;

/// Semantic errors returned by the engine's public operations.
///
/// Sensor and delivery failures are recovered or isolated inside the
/// lifecycles and never surface here; what does surface is invalid input,
/// lifecycle misuse, and settings problems.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Settings failed validation.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The location capability failed in a way the caller asked about
    /// directly (single-shot fix requests).
    #[error(transparent)]
    Location(#[from] LocationError),

    /// The contact store failed while taking a snapshot.
    #[error(transparent)]
    Contacts(#[from] ContactStoreError),

    /// A ride request failed validation.
    #[error("Invalid ride request: {0}")]
    InvalidRide(String),

    /// An SOS session is already running.
    #[error("SOS already active")]
    SosAlreadyActive,

    /// The voice watcher is already running.
    #[error("Voice watch already active")]
    VoiceWatchAlreadyActive,

    /// A ride is already being monitored.
    #[error("Ride monitoring already active")]
    RideAlreadyActive,

    /// No ride is being monitored.
    #[error("No active ride")]
    NoActiveRide,

    /// No pending safety check has this id.
    #[error("No pending safety check {0}")]
    UnknownCheck(Uuid),

    /// The safety check already reached a terminal state.
    #[error("Safety check {0} already resolved")]
    CheckAlreadyResolved(Uuid),
}
