//! Domain types for the escalation engine.
//!
//! Pure data + state machines, no I/O. These types cross the port
//! boundaries unchanged, so everything here is serde-enabled with
//! camelCase wire naming.

mod contact;
mod message;
mod position;
mod ride;
mod safety_check;
mod trigger;

pub use contact::{ContactValidationError, TrustedContact, normalize_phone};
pub use message::{EscalationKind, EscalationMessage};
pub use position::Position;
pub use ride::{RideLogEntry, RideSession, RideStatus, validate_vehicle_number};
pub use safety_check::{CheckOutcome, CheckResponse, CheckState, SafetyCheck, TransitionError};
pub use trigger::{TriggerEvent, TriggerOrigin, VoiceMatch};
