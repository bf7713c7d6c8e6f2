//! Ride-monitoring check-in timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use raksha_core::domain::TriggerEvent;
use raksha_core::ports::Clock;

/// Fires one [`TriggerEvent`] per interval while a ride session is active.
pub struct PeriodicCheckTrigger;

impl PeriodicCheckTrigger {
    /// Arm the timer.
    ///
    /// The first fire happens one full interval after the call, then every
    /// interval; missed ticks are skipped rather than bursted. The timer
    /// stops when `cancel` fires or the receiver is dropped — the caller's
    /// teardown deregisters it exactly once.
    #[must_use]
    pub fn spawn(
        period: Duration,
        clock: Arc<dyn Clock>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<TriggerEvent> {
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let event = TriggerEvent::periodic_check(clock.now_ms());
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Periodic check trigger disarmed");
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raksha_core::domain::TriggerOrigin;
    use raksha_core::stubs::FixedClock;

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_interval_after_the_first_period() {
        let cancel = CancellationToken::new();
        let mut rx = PeriodicCheckTrigger::spawn(
            Duration::from_secs(600),
            Arc::new(FixedClock::at(0)),
            cancel.clone(),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.origin, TriggerOrigin::PeriodicCheck);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.origin, TriggerOrigin::PeriodicCheck);

        cancel.cancel();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_firing_immediately() {
        let cancel = CancellationToken::new();
        let mut rx = PeriodicCheckTrigger::spawn(
            Duration::from_secs(600),
            Arc::new(FixedClock::at(0)),
            cancel.clone(),
        );

        cancel.cancel();
        assert!(rx.recv().await.is_none());
    }
}
