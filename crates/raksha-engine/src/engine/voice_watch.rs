//! The voice lifecycle: keyword fire → safety check → one-shot escalation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use raksha_core::domain::{CheckOutcome, EscalationKind};
use raksha_core::events::VoiceWatchState;

use super::EngineInner;
use crate::triggers::{VoiceTrigger, VoiceTriggerConfig};

/// Handle to the running voice lifecycle.
pub(crate) struct VoiceSession {
    cancel: CancellationToken,
    state_rx: watch::Receiver<VoiceWatchState>,
}

impl VoiceSession {
    pub(crate) fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub(crate) fn state(&self) -> VoiceWatchState {
        self.state_rx.borrow().clone()
    }

    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the voice lifecycle: watcher plus the check-and-escalate loop.
pub(crate) fn spawn(inner: Arc<EngineInner>) -> VoiceSession {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    let mut trigger = VoiceTrigger::spawn(
        Arc::clone(&inner.caps.speech),
        Arc::clone(&inner.caps.permissions),
        Arc::clone(&inner.caps.clock),
        Arc::clone(&inner.caps.events),
        VoiceTriggerConfig {
            keywords: inner.settings.keywords.clone(),
            restart_delay: Duration::from_millis(inner.settings.speech_restart_delay_ms),
        },
    );
    let state_rx = trigger.state_changes();

    tokio::spawn(async move {
        let grace = Duration::from_secs(inner.settings.voice_grace_secs);

        loop {
            let event = tokio::select! {
                () = task_cancel.cancelled() => break,
                fired = trigger.recv() => match fired {
                    // Watcher shut down (capability absence or denial); the
                    // state channel already says why.
                    None => break,
                    Some(event) => event,
                },
            };

            // The watcher stays disarmed while this check is pending, so a
            // second shout cannot open a second concurrent flow.
            let (handle, check_future) = inner.protocol.begin(event, grace, 0);
            inner.register_pending(&handle);

            let resolved = tokio::select! {
                () = task_cancel.cancelled() => {
                    inner.unregister_pending(handle.check_id());
                    break;
                }
                resolved = check_future => resolved,
            };
            inner.unregister_pending(handle.check_id());

            match resolved.outcome {
                CheckOutcome::Escalated => {
                    info!(check_id = %resolved.check.id, "Voice check unconfirmed, escalating");
                    inner
                        .dial_and_notify(EscalationKind::VoiceDetected, None)
                        .await;
                }
                outcome => {
                    debug!(check_id = %resolved.check.id, ?outcome, "Voice check cleared");
                }
            }
            trigger.rearm();
        }

        trigger.stop();
        debug!("Voice lifecycle ended");
    });

    VoiceSession { cancel, state_rx }
}
