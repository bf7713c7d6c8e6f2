//! Port definitions (trait abstractions) for platform capabilities.
//!
//! Ports define the interfaces the engine expects from the device and the
//! embedding application. They contain no implementation details and use
//! only domain types.
//!
//! # Design Rules
//!
//! - No platform plugin types in any signature
//! - Capability absence is queryable, never a panic
//! - Streams are `tokio::sync::mpsc` channels; dropping the receiver is the
//!   cancellation handle

pub mod clock;
pub mod contact_store;
pub mod event_emitter;
pub mod location;
pub mod notifier;
pub mod permissions;
pub mod ride_log;
pub mod speech;

use std::sync::Arc;

// Re-export port traits for convenience
pub use clock::{Clock, SystemClock};
pub use contact_store::{ContactStore, ContactStoreError};
pub use event_emitter::{EngineEventEmitter, NoopEmitter};
pub use location::{DEFAULT_FIX_TIMEOUT_MS, LocationError, LocationProvider, WatchOptions};
pub use notifier::{Notifier, NotifyError};
pub use permissions::{Capability, PermissionDecision, PermissionGate};
pub use ride_log::{RideLogError, RideLogSink};
pub use speech::{SpeechError, SpeechProvider, UtteranceEvent};

/// Container for all capability trait objects.
///
/// This struct provides a consistent way to wire capabilities into the
/// engine without coupling it to concrete platform implementations.
///
/// # Example
///
/// ```ignore
/// // In the embedding application's bootstrap:
/// let caps = Capabilities {
///     location: Arc::new(DeviceGps::new()),
///     speech: Arc::new(PlatformSpeech::new()),
///     ..
/// };
/// let engine = EscalationEngine::new(caps, EngineSettings::default())?;
/// ```
#[derive(Clone)]
pub struct Capabilities {
    /// Continuous and single-shot position acquisition.
    pub location: Arc<dyn LocationProvider>,
    /// Streaming speech recognition.
    pub speech: Arc<dyn SpeechProvider>,
    /// Text delivery and hotline dialing.
    pub notifier: Arc<dyn Notifier>,
    /// Runtime permission prompts.
    pub permissions: Arc<dyn PermissionGate>,
    /// Trusted-contact snapshots.
    pub contacts: Arc<dyn ContactStore>,
    /// Best-effort ride audit sink.
    pub ride_log: Arc<dyn RideLogSink>,
    /// Engine event push channel to the UI layer.
    pub events: Arc<dyn EngineEventEmitter>,
    /// Wall-clock source.
    pub clock: Arc<dyn Clock>,
}
