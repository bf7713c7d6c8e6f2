//! The timed "are you safe?" confirmation protocol.
//!
//! One call to [`ConfirmationProtocol::begin`] arms exactly one deadline
//! and hands back exactly one response channel. The returned future:
//!
//! 1. emits the prompt event for the UI layer,
//! 2. waits for a response **or** the deadline, whichever comes first,
//! 3. resolves the check exactly once and emits the resolution event.
//!
//! The losing select branch is dropped, so the deadline timer cannot fire
//! after a confirmation and a duplicate response is rejected with
//! [`RespondError::AlreadyResolved`] — the no-double-escalate property
//! holds by construction rather than by timing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

use raksha_core::domain::{CheckOutcome, CheckResponse, SafetyCheck, TriggerEvent};
use raksha_core::events::EngineEvent;
use raksha_core::ports::{Clock, EngineEventEmitter};

/// A duplicate response to an already-resolved check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Safety check already resolved")]
pub struct RespondError;

/// The user-response side of one pending check.
///
/// Held by the engine and looked up by check id when the UI answers the
/// prompt. Dropping the handle unanswered resolves the check as
/// `Cancelled`, which is how lifecycle teardown dismisses a pending
/// prompt without escalating it.
pub struct ResponseHandle {
    check_id: Uuid,
    tx: Mutex<Option<oneshot::Sender<CheckResponse>>>,
}

impl ResponseHandle {
    /// Id of the check this handle answers.
    #[must_use]
    pub const fn check_id(&self) -> Uuid {
        self.check_id
    }

    /// Deliver the user's answer. The first response wins.
    pub fn respond(&self, response: CheckResponse) -> Result<(), RespondError> {
        let sender = self
            .tx
            .lock()
            .expect("response handle lock")
            .take()
            .ok_or(RespondError)?;
        // A send failure means the check future already resolved (deadline
        // fired between lookup and response).
        sender.send(response).map_err(|_| RespondError)
    }
}

/// One resolved check: the terminal record plus its outcome.
#[derive(Debug, Clone)]
pub struct ResolvedCheck {
    /// The check in its terminal state.
    pub check: SafetyCheck,
    /// Which terminal state it reached.
    pub outcome: CheckOutcome,
}

/// Factory for safety checks, shared by the voice and ride lifecycles.
#[derive(Clone)]
pub struct ConfirmationProtocol {
    clock: Arc<dyn Clock>,
    events: Arc<dyn EngineEventEmitter>,
}

impl ConfirmationProtocol {
    /// Create a protocol bound to the given clock and event channel.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, events: Arc<dyn EngineEventEmitter>) -> Self {
        Self { clock, events }
    }

    /// Open a check and arm its deadline.
    ///
    /// Returns the response handle and the future that drives the check to
    /// its single terminal state. The caller owns scheduling of the future
    /// (the lifecycles select it against their own cancellation).
    pub fn begin(
        &self,
        trigger: TriggerEvent,
        grace: Duration,
        unresolved_count: u32,
    ) -> (Arc<ResponseHandle>, BoxFuture<'static, ResolvedCheck>) {
        let started_at_ms = self.clock.now_ms();
        let grace_ms = i64::try_from(grace.as_millis()).unwrap_or(i64::MAX);
        let mut check = SafetyCheck::open(trigger, started_at_ms, grace_ms, unresolved_count);

        let (tx, rx) = oneshot::channel();
        let handle = Arc::new(ResponseHandle {
            check_id: check.id,
            tx: Mutex::new(Some(tx)),
        });

        let events = Arc::clone(&self.events);
        events.emit(EngineEvent::SafetyCheckPrompt {
            check: check.clone(),
        });
        debug!(check_id = %check.id, grace_ms, "Safety check opened");

        let future = async move {
            let outcome = tokio::select! {
                response = rx => match response {
                    Ok(CheckResponse::Confirm) => CheckOutcome::Confirmed,
                    // An explicit dismissal and a dropped handle (lifecycle
                    // teardown) both end the check without escalating.
                    Ok(CheckResponse::Cancel) | Err(_) => CheckOutcome::Cancelled,
                },
                () = tokio::time::sleep(grace) => CheckOutcome::Escalated,
            };

            check
                .resolve(outcome)
                .expect("a pending check resolves exactly once");
            debug!(check_id = %check.id, ?outcome, "Safety check resolved");
            events.emit(EngineEvent::SafetyCheckResolved {
                check_id: check.id,
                outcome,
            });

            ResolvedCheck { check, outcome }
        }
        .boxed();

        (handle, future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raksha_core::domain::CheckState;
    use raksha_core::stubs::{FixedClock, RecordingEmitter};

    fn protocol(emitter: &Arc<RecordingEmitter>) -> ConfirmationProtocol {
        ConfirmationProtocol::new(
            Arc::new(FixedClock::at(1_000)),
            Arc::clone(emitter) as Arc<dyn EngineEventEmitter>,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn confirm_before_deadline_yields_confirmed() {
        let emitter = Arc::new(RecordingEmitter::default());
        let protocol = protocol(&emitter);
        let (handle, future) = protocol.begin(
            TriggerEvent::voice(1_000, "en-US", "help"),
            Duration::from_secs(60),
            0,
        );

        handle.respond(CheckResponse::Confirm).unwrap();
        let resolved = future.await;

        assert_eq!(resolved.outcome, CheckOutcome::Confirmed);
        assert_eq!(resolved.check.state, CheckState::Confirmed);
        assert_eq!(emitter.count_of("check:prompt"), 1);
        assert_eq!(emitter.count_of("check:resolved"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_check_escalates_exactly_once() {
        let emitter = Arc::new(RecordingEmitter::default());
        let protocol = protocol(&emitter);
        let (handle, future) =
            protocol.begin(TriggerEvent::periodic_check(1_000), Duration::from_secs(50), 2);

        let resolved = future.await;
        assert_eq!(resolved.outcome, CheckOutcome::Escalated);
        assert_eq!(resolved.check.unresolved_count, 2);

        // A response after the deadline is rejected, not double-counted.
        assert_eq!(handle.respond(CheckResponse::Confirm), Err(RespondError));
        assert_eq!(emitter.count_of("check:resolved"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_yields_cancelled() {
        let emitter = Arc::new(RecordingEmitter::default());
        let protocol = protocol(&emitter);
        let (handle, future) = protocol.begin(
            TriggerEvent::voice(1_000, "en-US", "help"),
            Duration::from_secs(60),
            0,
        );

        handle.respond(CheckResponse::Cancel).unwrap();
        assert_eq!(future.await.outcome, CheckOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_dismisses_without_escalating() {
        let emitter = Arc::new(RecordingEmitter::default());
        let protocol = protocol(&emitter);
        let (handle, future) =
            protocol.begin(TriggerEvent::periodic_check(1_000), Duration::from_secs(50), 0);

        drop(handle);
        assert_eq!(future.await.outcome, CheckOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn second_respond_is_rejected() {
        let emitter = Arc::new(RecordingEmitter::default());
        let protocol = protocol(&emitter);
        let (handle, future) = protocol.begin(
            TriggerEvent::voice(1_000, "en-US", "help"),
            Duration::from_secs(60),
            0,
        );

        handle.respond(CheckResponse::Confirm).unwrap();
        assert_eq!(handle.respond(CheckResponse::Cancel), Err(RespondError));
        assert_eq!(future.await.outcome, CheckOutcome::Confirmed);
    }

    #[test]
    fn deadline_is_started_plus_grace() {
        let emitter = Arc::new(RecordingEmitter::default());
        let protocol = ConfirmationProtocol::new(
            Arc::new(FixedClock::at(10_000)),
            Arc::clone(&emitter) as Arc<dyn EngineEventEmitter>,
        );
        let (_handle, future) =
            protocol.begin(TriggerEvent::periodic_check(10_000), Duration::from_secs(50), 0);

        let events = emitter.events();
        match &events[0] {
            EngineEvent::SafetyCheckPrompt { check } => {
                assert_eq!(check.started_at_ms, 10_000);
                assert_eq!(check.deadline_ms, 60_000);
            }
            other => panic!("unexpected event {other:?}"),
        }
        drop(future);
    }
}
