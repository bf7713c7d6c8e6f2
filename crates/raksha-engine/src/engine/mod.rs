//! The escalation engine: three lifecycles behind one API.
//!
//! ```text
//!   SOS button ───────────▶ dial + live location fan-out
//!   voice keyword ──▶ safety check ──▶ (unconfirmed) dial + fan-out
//!   ride check-in ──▶ safety check ──▶ (3 strikes)   dial + fan-out
//! ```
//!
//! Each lifecycle is one task selecting over its trigger source, its
//! pending check, and its cancellation token — no shared mutable state
//! beyond the freshest-fix cache and the read-only contact snapshot taken
//! per escalation. Stopping a lifecycle cancels its timers and
//! subscriptions deterministically; I/O teardown completes asynchronously
//! underneath.

mod ride;
mod sos;
mod voice_watch;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use raksha_core::domain::{
    CheckResponse, EscalationKind, EscalationMessage, Position, RideLogEntry, RideSession,
    RideStatus, normalize_phone, validate_vehicle_number,
};
use raksha_core::events::{EngineEvent, VoiceWatchState};
use raksha_core::ports::{Capabilities, Capability, WatchOptions};
use raksha_core::settings::{EngineSettings, validate_settings};

use crate::confirmation::{ConfirmationProtocol, ResponseHandle};
use crate::error::EngineError;
use crate::fanout::{DeliveryReport, NotificationFanout};
use crate::location::LocationSource;
use crate::triggers::ManualTrigger;

/// Request to start ride monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideStart {
    /// Destination as entered by the user.
    pub destination: String,
    /// Vehicle registration (e.g. `MH02AB1234`).
    pub vehicle_number: String,
    /// Driver/vehicle contact number.
    pub contact_phone: String,
    /// Starting point for the audit row, if the caller knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

/// Everything the lifecycles share.
pub(crate) struct EngineInner {
    caps: Capabilities,
    settings: EngineSettings,
    location: LocationSource,
    fanout: NotificationFanout,
    protocol: ConfirmationProtocol,
    manual: ManualTrigger,
    pending: Mutex<HashMap<Uuid, Arc<ResponseHandle>>>,
    sos: Mutex<Option<sos::SosHandle>>,
    voice: Mutex<Option<voice_watch::VoiceSession>>,
    ride: Mutex<Option<ride::RideHandle>>,
}

impl EngineInner {
    pub(crate) fn register_pending(&self, handle: &Arc<ResponseHandle>) {
        self.pending
            .lock()
            .expect("pending map lock")
            .insert(handle.check_id(), Arc::clone(handle));
    }

    pub(crate) fn unregister_pending(&self, check_id: Uuid) {
        self.pending
            .lock()
            .expect("pending map lock")
            .remove(&check_id);
    }

    /// Freshest fix: the cache, else one single-shot attempt.
    pub(crate) async fn freshest_position(&self) -> Option<Position> {
        if let Some(fix) = self.location.latest() {
            return Some(fix);
        }
        match self.location.once().await {
            Ok(fix) => Some(fix),
            Err(error) => {
                warn!(%error, "No fix available for escalation message");
                None
            }
        }
    }

    /// One dial-and-notify pass with a fresh contact snapshot.
    ///
    /// Pass the position when the caller already holds the freshest fix
    /// (the SOS live loop); otherwise it is looked up, best-effort.
    pub(crate) async fn dial_and_notify(
        &self,
        kind: EscalationKind,
        position: Option<Position>,
    ) -> DeliveryReport {
        let position = match position {
            Some(fix) => Some(fix),
            None => self.freshest_position().await,
        };
        let contacts = match self.caps.contacts.list_contacts().await {
            Ok(contacts) => contacts,
            Err(error) => {
                // The dial must still go out with nobody to text.
                error!(%error, "Contact snapshot failed, dialing without fan-out");
                Vec::new()
            }
        };

        let message = EscalationMessage::compose(
            kind,
            position.as_ref(),
            contacts,
            self.settings.hotline.clone(),
            self.caps.clock.now_ms(),
        );
        let report = self.fanout.notify(&message).await;

        self.caps.events.emit(EngineEvent::AlertDelivered {
            kind,
            delivered: u32::try_from(report.delivered_count()).unwrap_or(u32::MAX),
            failed: u32::try_from(report.failed_count()).unwrap_or(u32::MAX),
            unsupported: report.unsupported,
        });
        report
    }

    /// Write a ride audit row, fire-and-forget.
    pub(crate) fn record_ride(self: &Arc<Self>, entry: RideLogEntry) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = inner.caps.ride_log.record(entry).await {
                warn!(%error, "Ride audit write failed (ignored)");
            }
        });
    }

    /// Update a ride audit row's status, fire-and-forget.
    pub(crate) fn record_ride_status(self: &Arc<Self>, id: Uuid, status: RideStatus) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = inner.caps.ride_log.update_status(id, status).await {
                warn!(%error, "Ride audit status update failed (ignored)");
            }
        });
    }
}

/// The escalation engine.
///
/// Cheap to clone; all clones drive the same lifecycles.
#[derive(Clone)]
pub struct EscalationEngine {
    inner: Arc<EngineInner>,
}

impl EscalationEngine {
    /// Build an engine over the given capabilities.
    ///
    /// Must be called within a tokio runtime; the lifecycles spawn tasks.
    pub fn new(caps: Capabilities, settings: EngineSettings) -> Result<Self, EngineError> {
        validate_settings(&settings)?;

        let location = LocationSource::new(
            Arc::clone(&caps.location),
            WatchOptions::default(),
            Duration::from_secs(settings.location_poll_secs),
        );
        let fanout = NotificationFanout::new(Arc::clone(&caps.notifier));
        let protocol = ConfirmationProtocol::new(Arc::clone(&caps.clock), Arc::clone(&caps.events));
        let manual = ManualTrigger::new(Arc::clone(&caps.clock));

        Ok(Self {
            inner: Arc::new(EngineInner {
                caps,
                settings,
                location,
                fanout,
                protocol,
                manual,
                pending: Mutex::new(HashMap::new()),
                sos: Mutex::new(None),
                voice: Mutex::new(None),
                ride: Mutex::new(None),
            }),
        })
    }

    // ── SOS lifecycle ──────────────────────────────────────────────

    /// Fire the SOS: immediate hotline dial, then live location fan-out
    /// until [`stop_sos`](Self::stop_sos).
    pub fn trigger_sos(&self) -> Result<(), EngineError> {
        let mut slot = self.inner.sos.lock().expect("sos lock");
        if slot.as_ref().is_some_and(sos::SosHandle::is_active) {
            return Err(EngineError::SosAlreadyActive);
        }

        let trigger = self.inner.manual.fire();
        info!(detected_at_ms = trigger.detected_at_ms, "SOS triggered");
        self.inner.caps.events.emit(EngineEvent::SosStarted);
        *slot = Some(sos::spawn(Arc::clone(&self.inner)));
        Ok(())
    }

    /// Stop the SOS session. Returns whether one was running.
    pub fn stop_sos(&self) -> bool {
        let handle = self.inner.sos.lock().expect("sos lock").take();
        match handle {
            Some(handle) => {
                handle.stop();
                self.inner.caps.events.emit(EngineEvent::SosStopped);
                true
            }
            None => false,
        }
    }

    /// Whether an SOS session is running.
    #[must_use]
    pub fn sos_active(&self) -> bool {
        self.inner
            .sos
            .lock()
            .expect("sos lock")
            .as_ref()
            .is_some_and(sos::SosHandle::is_active)
    }

    // ── Voice lifecycle ────────────────────────────────────────────

    /// Start voice keyword detection.
    ///
    /// Succeeds even when the platform has no recognition capability or
    /// the microphone permission is denied — those degrade to observable
    /// states, not errors (the UI shows "voice detection inactive").
    pub fn start_voice_watch(&self) -> Result<(), EngineError> {
        let mut slot = self.inner.voice.lock().expect("voice lock");
        if slot.as_ref().is_some_and(voice_watch::VoiceSession::is_active) {
            return Err(EngineError::VoiceWatchAlreadyActive);
        }
        *slot = Some(voice_watch::spawn(Arc::clone(&self.inner)));
        Ok(())
    }

    /// Stop voice detection. Returns whether it was running.
    pub fn stop_voice_watch(&self) -> bool {
        let session = self.inner.voice.lock().expect("voice lock").take();
        match session {
            Some(session) => {
                session.stop();
                true
            }
            None => false,
        }
    }

    /// Current state of the voice watcher.
    #[must_use]
    pub fn voice_watch_state(&self) -> VoiceWatchState {
        self.inner
            .voice
            .lock()
            .expect("voice lock")
            .as_ref()
            .map_or(VoiceWatchState::Inactive, voice_watch::VoiceSession::state)
    }

    // ── Ride lifecycle ─────────────────────────────────────────────

    /// Start ride monitoring with periodic safety checks.
    pub async fn start_ride(&self, request: RideStart) -> Result<RideSession, EngineError> {
        let destination = request.destination.trim().to_string();
        if destination.len() < 3 {
            return Err(EngineError::InvalidRide("Destination is required".into()));
        }
        if !validate_vehicle_number(&request.vehicle_number) {
            return Err(EngineError::InvalidRide(
                "Enter a valid vehicle number (e.g., MH02AB1234)".into(),
            ));
        }
        let contact_phone = normalize_phone(&request.contact_phone)
            .map_err(|e| EngineError::InvalidRide(e.to_string()))?;

        {
            let slot = self.inner.ride.lock().expect("ride lock");
            if slot
                .as_ref()
                .is_some_and(|h| h.snapshot().status == RideStatus::Active)
            {
                return Err(EngineError::RideAlreadyActive);
            }
        }

        let session = RideSession::start(
            destination,
            request.vehicle_number,
            contact_phone,
            self.inner.caps.clock.now_ms(),
        );

        // Audit row, best-effort. Fall back to the freshest coordinates
        // when the caller did not name a starting point.
        let origin = match request.origin {
            Some(origin) => Some(origin),
            None => self
                .inner
                .location
                .latest()
                .map(|fix| format!("{},{}", fix.latitude, fix.longitude)),
        };
        self.inner
            .record_ride(RideLogEntry::from_session(&session, origin));

        info!(session_id = %session.id, destination = %session.destination, "Ride monitoring started");
        self.inner.caps.events.emit(EngineEvent::RideStarted {
            session: session.clone(),
        });

        let handle = ride::spawn(Arc::clone(&self.inner), session.clone());
        *self.inner.ride.lock().expect("ride lock") = Some(handle);
        Ok(session)
    }

    /// Stop ride monitoring. The session completes unless it already
    /// escalated.
    pub fn stop_ride(&self) -> Result<RideSession, EngineError> {
        let handle = self
            .inner
            .ride
            .lock()
            .expect("ride lock")
            .take()
            .ok_or(EngineError::NoActiveRide)?;

        handle.stop();
        let session = handle.complete_if_active();
        if session.status == RideStatus::Completed {
            info!(session_id = %session.id, "Ride monitoring stopped");
            self.inner
                .record_ride_status(session.id, RideStatus::Completed);
            self.inner
                .caps
                .events
                .emit(EngineEvent::RideCompleted {
                    session_id: session.id,
                });
        }
        Ok(session)
    }

    /// The ride currently being monitored, if any.
    #[must_use]
    pub fn active_ride(&self) -> Option<RideSession> {
        self.inner
            .ride
            .lock()
            .expect("ride lock")
            .as_ref()
            .map(ride::RideHandle::snapshot)
            .filter(|session| session.status == RideStatus::Active)
    }

    // ── Safety check responses ─────────────────────────────────────

    /// Answer a pending safety check prompt.
    pub fn respond(&self, check_id: Uuid, response: CheckResponse) -> Result<(), EngineError> {
        let handle = self
            .inner
            .pending
            .lock()
            .expect("pending map lock")
            .get(&check_id)
            .cloned()
            .ok_or(EngineError::UnknownCheck(check_id))?;
        handle
            .respond(response)
            .map_err(|_| EngineError::CheckAlreadyResolved(check_id))
    }

    /// Shorthand for answering "yes, I'm safe".
    pub fn confirm_safe(&self, check_id: Uuid) -> Result<(), EngineError> {
        self.respond(check_id, CheckResponse::Confirm)
    }

    // ── Location passthrough ───────────────────────────────────────

    /// One fresh fix for the location-sharing screen.
    ///
    /// Requests the location permission first; a denial is surfaced as a
    /// user-visible failure state.
    pub async fn current_position(&self) -> Result<Position, EngineError> {
        if !self
            .inner
            .caps
            .permissions
            .request(Capability::Location)
            .await
            .is_granted()
        {
            return Err(raksha_core::ports::LocationError::PermissionDenied.into());
        }
        Ok(self.inner.location.once().await?)
    }

    /// Freshest cached fix, if any.
    #[must_use]
    pub fn latest_position(&self) -> Option<Position> {
        self.inner.location.latest()
    }

    // ── Teardown ───────────────────────────────────────────────────

    /// Stop every lifecycle and the location feed.
    pub fn shutdown(&self) {
        self.stop_sos();
        self.stop_voice_watch();
        // NoActiveRide just means there is nothing to tear down.
        let _ = self.stop_ride();
        self.inner.location.stop();
    }
}
