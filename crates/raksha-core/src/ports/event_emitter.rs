//! Engine event emitter port.

use crate::events::EngineEvent;

/// Port for pushing engine events to the embedding application.
///
/// This is the engine's entire UI surface: safety-check prompts, lifecycle
/// state changes, delivery reports, and diagnostic drops all arrive here.
/// Implementations must be cheap and non-blocking — emission happens on the
/// engine's own tasks.
pub trait EngineEventEmitter: Send + Sync {
    /// Emit one event. Best-effort; the engine never waits on the consumer.
    fn emit(&self, event: EngineEvent);
}

/// Emitter that discards events (headless or test usage).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmitter;

impl EngineEventEmitter for NoopEmitter {
    fn emit(&self, event: EngineEvent) {
        tracing::trace!(event = event.event_name(), "Event dropped (noop emitter)");
    }
}
