//! The SOS lifecycle: immediate dial, then live location fan-out.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use raksha_core::domain::{EscalationKind, Position};
use raksha_core::events::EngineEvent;
use raksha_core::ports::Capability;

use super::EngineInner;
use crate::location::LastEvent;

/// Handle to a running SOS session.
pub(crate) struct SosHandle {
    cancel: CancellationToken,
}

impl SosHandle {
    pub(crate) fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }
}

/// Spawn the SOS task: dial the hotline right away, start the location
/// feed, and fan the freshest fix out to the trusted contacts at most once
/// per rate-limit window until stopped.
pub(crate) fn spawn(inner: Arc<EngineInner>) -> SosHandle {
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();

    tokio::spawn(async move {
        // The dial goes out before anything that could fail or wait.
        if let Err(error) = inner.caps.notifier.dial(&inner.settings.hotline).await {
            error!(%error, "SOS hotline dial failed");
        } else {
            info!(hotline = %inner.settings.hotline, "SOS hotline dialed");
        }

        if !inner
            .caps
            .permissions
            .request(Capability::Location)
            .await
            .is_granted()
        {
            inner.caps.events.emit(EngineEvent::LocationUnavailable {
                reason: "could not access location".to_string(),
            });
            // Dial-only SOS: hold the session open until stopped so the
            // user keeps the "SOS active" state they asked for.
            task_cancel.cancelled().await;
            return;
        }

        let mut feed = inner.location.start();
        let window = Duration::from_secs(inner.settings.notify_min_interval_secs);
        let mut ticker = interval(window);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last_sent_at: Option<Instant> = None;
        let mut last_sent_ts: Option<i64> = None;
        let mut surfaced_unavailable = false;

        loop {
            tokio::select! {
                () = task_cancel.cancelled() => break,

                changed = feed.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let event = feed.borrow_and_update().last.clone();
                    match event {
                        Some(LastEvent::Fix(fix)) => {
                            maybe_send(&inner, fix, window, &mut last_sent_at, &mut last_sent_ts)
                                .await;
                        }
                        Some(LastEvent::Failure(failure)) => {
                            if failure.is_terminal() && !surfaced_unavailable {
                                surfaced_unavailable = true;
                                inner.caps.events.emit(EngineEvent::LocationUnavailable {
                                    reason: "could not access location".to_string(),
                                });
                            }
                        }
                        None => {}
                    }
                }

                // Trailing edge of the rate limit: samples coalesced during
                // a closed window still go out once it reopens.
                _ = ticker.tick() => {
                    if let Some(fix) = inner.location.latest() {
                        maybe_send(&inner, fix, window, &mut last_sent_at, &mut last_sent_ts)
                            .await;
                    }
                }
            }
        }

        inner.location.stop();
        debug!("SOS session ended");
    });

    SosHandle { cancel }
}

/// Fan out the fix unless the rate-limit window is closed or the fix has
/// already been sent.
async fn maybe_send(
    inner: &Arc<EngineInner>,
    fix: Position,
    window: Duration,
    last_sent_at: &mut Option<Instant>,
    last_sent_ts: &mut Option<i64>,
) {
    let fresh = *last_sent_ts != Some(fix.captured_at_ms);
    let window_open = last_sent_at.is_none_or(|at| at.elapsed() >= window);
    if !(fresh && window_open) {
        debug!(
            captured_at_ms = fix.captured_at_ms,
            fresh, window_open, "Coalescing location update"
        );
        return;
    }

    *last_sent_at = Some(Instant::now());
    *last_sent_ts = Some(fix.captured_at_ms);
    inner
        .dial_and_notify(EscalationKind::Sos, Some(fix))
        .await;
}
