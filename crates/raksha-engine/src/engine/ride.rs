//! The ride lifecycle: periodic check-ins with 3-strike escalation.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use raksha_core::domain::{CheckOutcome, EscalationKind, RideSession, RideStatus, TriggerOrigin};
use raksha_core::events::EngineEvent;

use super::EngineInner;
use crate::triggers::PeriodicCheckTrigger;

/// Handle to a monitored ride.
pub(crate) struct RideHandle {
    session: Arc<Mutex<RideSession>>,
    cancel: CancellationToken,
}

impl RideHandle {
    pub(crate) fn snapshot(&self) -> RideSession {
        self.session.lock().expect("ride session lock").clone()
    }

    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    /// Transition to Completed unless the ride already escalated; returns
    /// the final session state.
    pub(crate) fn complete_if_active(&self) -> RideSession {
        let mut session = self.session.lock().expect("ride session lock");
        if session.status == RideStatus::Active {
            session.status = RideStatus::Completed;
        }
        session.clone()
    }
}

/// Spawn the ride monitor: arm the periodic trigger, open one check per
/// fire (dropping fires while one is pending), escalate after the
/// configured run of consecutive unconfirmed checks.
pub(crate) fn spawn(inner: Arc<EngineInner>, session: RideSession) -> RideHandle {
    let session = Arc::new(Mutex::new(session));
    let cancel = CancellationToken::new();

    let task_session = Arc::clone(&session);
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        let grace = Duration::from_secs(inner.settings.ride_grace_secs);
        let threshold = inner.settings.ride_unresolved_threshold;
        let mut trigger_rx = PeriodicCheckTrigger::spawn(
            Duration::from_secs(inner.settings.ride_check_interval_secs),
            Arc::clone(&inner.caps.clock),
            task_cancel.clone(),
        );

        let mut unresolved: u32 = 0;

        'monitor: loop {
            // Wait for the next check-in tick.
            let event = tokio::select! {
                () = task_cancel.cancelled() => break 'monitor,
                fired = trigger_rx.recv() => match fired {
                    None => break 'monitor,
                    Some(event) => event,
                },
            };

            let (handle, mut check_future) = inner.protocol.begin(event, grace, unresolved);
            inner.register_pending(&handle);

            // Drive the check to resolution, dropping any ticks that land
            // while it is pending (one pending check per lifecycle; the
            // drop is diagnostic, not a user-facing error).
            let resolved = loop {
                tokio::select! {
                    () = task_cancel.cancelled() => {
                        inner.unregister_pending(handle.check_id());
                        break 'monitor;
                    }
                    resolved = &mut check_future => break resolved,
                    fired = trigger_rx.recv() => {
                        if fired.is_some() {
                            debug!("Check still pending, dropping periodic trigger");
                            inner.caps.events.emit(EngineEvent::TriggerIgnored {
                                origin: TriggerOrigin::PeriodicCheck,
                            });
                        }
                    }
                }
            };
            inner.unregister_pending(handle.check_id());

            match resolved.outcome {
                CheckOutcome::Confirmed => {
                    debug!(unresolved, "Check confirmed, strike counter reset");
                    unresolved = 0;
                }
                CheckOutcome::Cancelled => {
                    // Dismissal: no confirmation, but no strike either.
                }
                CheckOutcome::Escalated => {
                    unresolved += 1;
                    warn!(unresolved, threshold, "Ride check went unanswered");
                    if unresolved >= threshold {
                        escalate(&inner, &task_session).await;
                        task_cancel.cancel();
                        break 'monitor;
                    }
                }
            }
        }

        debug!("Ride monitor ended");
    });

    RideHandle { session, cancel }
}

/// Transition the ride to Emergency and run the dial-and-notify sequence.
async fn escalate(inner: &Arc<EngineInner>, session: &Arc<Mutex<RideSession>>) {
    let snapshot = {
        let mut session = session.lock().expect("ride session lock");
        session.status = RideStatus::Emergency;
        session.clone()
    };

    info!(session_id = %snapshot.id, "Ride escalated to emergency");
    inner.caps.events.emit(EngineEvent::RideEmergency {
        session_id: snapshot.id,
    });
    inner.record_ride_status(snapshot.id, RideStatus::Emergency);
    inner
        .dial_and_notify(EscalationKind::RideUnresponsive, None)
        .await;
}
