//! Emergency escalation engine.
//!
//! Coordinates location acquisition, emergency triggers (manual SOS, voice
//! keyword, missed ride check-ins), the timed "are you safe?" confirmation
//! protocol, and fan-out notification to trusted contacts. All platform
//! access goes through the `raksha-core` ports; this crate owns the
//! cross-cutting state and the three escalation lifecycles.
#![deny(unused_crate_dependencies)]

pub mod confirmation;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod location;
pub mod triggers;

// Re-export key types for convenience
pub use confirmation::{ConfirmationProtocol, ResolvedCheck, ResponseHandle};
pub use engine::{EscalationEngine, RideStart};
pub use error::EngineError;
pub use fanout::{ContactDelivery, DeliveryReport, NotificationFanout};
pub use location::{LocationSnapshot, LocationSource};
pub use triggers::{ManualTrigger, PeriodicCheckTrigger, VoiceTrigger, VoiceTriggerConfig};

// Silence unused dev-dependency warnings for integration-test-only deps
#[cfg(test)]
use anyhow as _;
#[cfg(test)]
use tracing_subscriber as _;
