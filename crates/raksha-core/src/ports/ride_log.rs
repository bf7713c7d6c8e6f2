//! Ride audit sink port.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{RideLogEntry, RideStatus};

/// Errors from the audit sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RideLogError {
    /// The backend could not be reached or rejected the write.
    #[error("Ride log unavailable: {0}")]
    Unavailable(String),
}

/// Best-effort audit sink for ride sessions.
///
/// Writes are fire-and-forget from the engine's point of view: failures are
/// logged and never feed back into escalation decisions.
#[async_trait]
pub trait RideLogSink: Send + Sync {
    /// Record a new ride session row.
    async fn record(&self, entry: RideLogEntry) -> Result<(), RideLogError>;

    /// Update the status column of an existing row.
    async fn update_status(&self, id: Uuid, status: RideStatus) -> Result<(), RideLogError>;
}
