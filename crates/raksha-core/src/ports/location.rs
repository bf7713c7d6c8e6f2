//! Location provider port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::Position;

/// Default single-fix timeout, matching the platform defaults the engine
/// was tuned against.
pub const DEFAULT_FIX_TIMEOUT_MS: u64 = 10_000;

/// Options for a watch subscription or single-shot fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    /// Request the most precise source the platform has (GPS over network).
    pub high_accuracy: bool,
    /// Maximum acceptable age of a cached fix (0 = always fresh).
    pub max_age_ms: u64,
    /// How long one fix may take before the provider reports a timeout.
    pub timeout_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            max_age_ms: 0,
            timeout_ms: DEFAULT_FIX_TIMEOUT_MS,
        }
    }
}

/// Errors from the location provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user denied location access. Terminal for the capability.
    #[error("Location permission denied")]
    PermissionDenied,

    /// A fix did not arrive within the configured timeout. Transient.
    #[error("Timed out waiting for a location fix")]
    Timeout,

    /// The platform could not produce a fix right now. Transient.
    #[error("Position unavailable: {0}")]
    Unavailable(String),

    /// Unexpected provider failure.
    #[error("Location provider error: {0}")]
    Provider(String),
}

impl LocationError {
    /// Whether the error permanently disables the capability.
    ///
    /// Non-terminal errors are retried by the owning component's own
    /// cadence (the poll interval), never in a tight internal loop.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Port for continuous and single-shot position acquisition.
///
/// The returned channel is the subscription handle: dropping the receiver
/// clears the underlying platform watch.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Start a continuous watch. Samples and sample-failures arrive on the
    /// channel in provider order.
    async fn watch(
        &self,
        options: WatchOptions,
    ) -> Result<mpsc::Receiver<Result<Position, LocationError>>, LocationError>;

    /// Acquire one fresh fix.
    async fn current(&self, options: WatchOptions) -> Result<Position, LocationError>;
}
