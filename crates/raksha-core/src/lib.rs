//! Core domain types and port definitions for the raksha safety engine.
//!
//! This crate is infrastructure-free: domain types, the capability traits
//! ("ports") the engine expects from the platform, the canonical event
//! union, and engine settings. Concrete providers (device GPS, platform
//! speech APIs, SMS/telephony plugins) live behind the ports and are wired
//! by the embedding application.
//!
//! The `test-utils` feature exposes stub port implementations for tests
//! and demos.
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod settings;

#[cfg(any(test, feature = "test-utils"))]
pub mod stubs;

// Re-export commonly used types for convenience
pub use domain::{
    CheckOutcome, CheckResponse, CheckState, EscalationKind, EscalationMessage, Position,
    RideLogEntry, RideSession, RideStatus, SafetyCheck, TransitionError, TriggerEvent,
    TriggerOrigin, TrustedContact, VoiceMatch, normalize_phone, validate_vehicle_number,
};
pub use events::{EngineEvent, VoiceWatchState};
pub use ports::{
    Capabilities, Capability, Clock, ContactStore, ContactStoreError, EngineEventEmitter,
    LocationError, LocationProvider, NoopEmitter, Notifier, NotifyError, PermissionDecision,
    PermissionGate, RideLogError, RideLogSink, SpeechError, SpeechProvider, SystemClock,
    UtteranceEvent, WatchOptions,
};
pub use settings::{EngineSettings, LanguageKeywords, SettingsError, validate_settings};

// Silence unused dev-dependency warnings until we add mock-based tests
#[cfg(test)]
use mockall as _;
#[cfg(test)]
use tokio_test as _;
