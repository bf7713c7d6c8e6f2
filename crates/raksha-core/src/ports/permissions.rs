//! Runtime permission port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Platform capabilities the engine asks permission for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Geolocation access.
    Location,
    /// Microphone access for voice detection.
    Microphone,
    /// Local notification prompts for safety checks.
    Notifications,
}

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    /// Granted; the capability may be used.
    Granted,
    /// Denied; the dependent feature degrades to a visible disabled state.
    Denied,
}

impl PermissionDecision {
    /// Whether the capability may be used.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Port for requesting runtime permissions.
///
/// Queried before starting the location or speech providers; a denial is
/// terminal for the dependent capability and surfaced once.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Request (or re-check) a capability permission.
    async fn request(&self, capability: Capability) -> PermissionDecision;
}
