//! Watch-plus-poll location merge.
//!
//! One continuous provider watch plus a periodic single-shot poll, merged
//! into a single monotonic feed:
//!
//! ```text
//!   provider.watch ──┐
//!                    ├──▶ freshest-fix snapshot ──▶ subscribers
//!   poll every N s ──┘        (timestamp-ordered)
//! ```
//!
//! The poll bounds staleness when the watch callback is delayed; the
//! timestamp guard guarantees a late-arriving lower-timestamp sample never
//! overwrites a newer one. Permission-denied is terminal and reported once;
//! timeouts and unavailability are forwarded and retried on the poll
//! cadence, never in an internal hot loop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use futures_util::Stream;
use tokio::sync::{mpsc, watch};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use raksha_core::domain::Position;
use raksha_core::ports::{LocationError, LocationProvider, WatchOptions};

/// The most recent event surfaced by the merge.
#[derive(Debug, Clone)]
pub(crate) enum LastEvent {
    /// A fresh fix was accepted.
    Fix(Position),
    /// A sample failure was forwarded.
    Failure(LocationError),
}

/// Consumer-visible state of the merged feed.
#[derive(Debug, Clone, Default)]
pub struct LocationSnapshot {
    /// Freshest accepted fix, if any.
    pub fix: Option<Position>,
    /// Whether the feed has ended (terminal error or explicit stop).
    pub ended: bool,
    pub(crate) last: Option<LastEvent>,
}

/// Merged, restartable location feed over a [`LocationProvider`].
pub struct LocationSource {
    provider: Arc<dyn LocationProvider>,
    options: WatchOptions,
    poll_interval: Duration,
    running: Mutex<Option<CancellationToken>>,
    snapshot_tx: watch::Sender<LocationSnapshot>,
}

impl LocationSource {
    /// Create a stopped source.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        options: WatchOptions,
        poll_interval: Duration,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(LocationSnapshot::default());
        Self {
            provider,
            options,
            poll_interval,
            running: Mutex::new(None),
            snapshot_tx,
        }
    }

    /// Start the merge task and subscribe to the feed.
    ///
    /// Idempotent: starting an already-running source returns a new
    /// subscription to the existing feed — it never opens a second
    /// provider watch.
    pub fn start(&self) -> watch::Receiver<LocationSnapshot> {
        let mut running = self.running.lock().expect("location source lock");
        let live = running.as_ref().is_some_and(|token| !token.is_cancelled());
        if live {
            return self.snapshot_tx.subscribe();
        }

        let cancel = CancellationToken::new();
        *running = Some(cancel.clone());
        // Fresh run: clear whatever the previous run left behind, and
        // subscribe before the merge task can publish anything.
        self.snapshot_tx.send_replace(LocationSnapshot::default());
        let rx = self.snapshot_tx.subscribe();

        tokio::spawn(run_merge(
            Arc::clone(&self.provider),
            self.options,
            self.poll_interval,
            cancel,
            self.snapshot_tx.clone(),
        ));
        rx
    }

    /// Stop the merge task. Open streams observe the end and complete.
    pub fn stop(&self) {
        if let Some(token) = self.running.lock().expect("location source lock").take() {
            token.cancel();
        }
        self.snapshot_tx.send_modify(|snap| {
            snap.ended = true;
            snap.last = None;
        });
    }

    /// Whether the merge task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .expect("location source lock")
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Freshest cached fix, if any sample has been accepted.
    #[must_use]
    pub fn latest(&self) -> Option<Position> {
        self.snapshot_tx.borrow().fix.clone()
    }

    /// Acquire one fresh fix, also feeding it into the cache.
    pub async fn once(&self) -> Result<Position, LocationError> {
        let fix = self.provider.current(self.options).await?;
        publish_fix(&self.snapshot_tx, fix.clone());
        Ok(fix)
    }

    /// Subscribe to raw snapshots (engine-internal consumers).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LocationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The feed as a lazy stream of samples and sample-failures.
    ///
    /// Intermediate samples are coalesced to the latest one; the stream
    /// completes on terminal error or stop.
    pub fn stream(&self) -> impl Stream<Item = Result<Position, LocationError>> + Send + use<> {
        let mut rx = self.snapshot_tx.subscribe();
        stream! {
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let (event, ended) = {
                    let snap = rx.borrow_and_update();
                    (snap.last.clone(), snap.ended)
                };
                match event {
                    Some(LastEvent::Fix(fix)) => yield Ok(fix),
                    Some(LastEvent::Failure(error)) => yield Err(error),
                    None => {}
                }
                if ended {
                    break;
                }
            }
        }
    }
}

impl Drop for LocationSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The merge loop: one watch subscription plus the poll ticker.
async fn run_merge(
    provider: Arc<dyn LocationProvider>,
    options: WatchOptions,
    poll_interval: Duration,
    cancel: CancellationToken,
    tx: watch::Sender<LocationSnapshot>,
) {
    let mut watch_rx: Option<mpsc::Receiver<Result<Position, LocationError>>> = None;
    match provider.watch(options).await {
        Ok(rx) => watch_rx = Some(rx),
        Err(error) => {
            if publish_failure(&tx, error) {
                cancel.cancel();
                return;
            }
        }
    }

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    debug!(poll_secs = poll_interval.as_secs(), "Location merge started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,

            sample = async { watch_rx.as_mut().expect("guarded by branch condition").recv().await },
                if watch_rx.is_some() =>
            {
                match sample {
                    None => {
                        debug!("Provider watch closed, poll continues");
                        watch_rx = None;
                    }
                    Some(Ok(fix)) => publish_fix(&tx, fix),
                    Some(Err(error)) => {
                        if publish_failure(&tx, error) {
                            cancel.cancel();
                            break;
                        }
                    }
                }
            }

            _ = ticker.tick() => {
                // Re-acquire the watch on the poll cadence if it dropped.
                if watch_rx.is_none() {
                    match provider.watch(options).await {
                        Ok(rx) => watch_rx = Some(rx),
                        Err(error) => {
                            if publish_failure(&tx, error) {
                                cancel.cancel();
                                break;
                            }
                        }
                    }
                }
                match provider.current(options).await {
                    Ok(fix) => publish_fix(&tx, fix),
                    Err(error) => {
                        if publish_failure(&tx, error) {
                            cancel.cancel();
                            break;
                        }
                    }
                }
            }
        }
    }

    // The stop() path and the terminal-failure path have both already
    // marked the snapshot ended; a final send here would race a restart.
    debug!("Location merge stopped");
}

/// Accept a fix if it is newer than the held one.
fn publish_fix(tx: &watch::Sender<LocationSnapshot>, fix: Position) {
    tx.send_if_modified(|snap| {
        if snap.fix.as_ref().is_none_or(|current| fix.supersedes(current)) {
            snap.last = Some(LastEvent::Fix(fix.clone()));
            snap.fix = Some(fix.clone());
            true
        } else {
            debug!(
                captured_at_ms = fix.captured_at_ms,
                "Dropping stale location sample"
            );
            false
        }
    });
}

/// Forward a sample failure. Returns true when it is terminal.
fn publish_failure(tx: &watch::Sender<LocationSnapshot>, error: LocationError) -> bool {
    let terminal = error.is_terminal();
    if terminal {
        warn!(%error, "Location capability lost");
    } else {
        debug!(%error, "Transient location error");
    }
    tx.send_modify(|snap| {
        snap.last = Some(LastEvent::Failure(error));
        snap.ended |= terminal;
    });
    terminal
}

#[cfg(test)]
mod tests {
    use super::*;
    use raksha_core::stubs::ScriptedLocationProvider;
    use std::time::Duration;

    fn source(provider: Arc<ScriptedLocationProvider>) -> LocationSource {
        LocationSource::new(provider, WatchOptions::default(), Duration::from_secs(3))
    }

    #[tokio::test(start_paused = true)]
    async fn late_stale_sample_never_overwrites_newer_fix() {
        let provider = Arc::new(ScriptedLocationProvider::default());
        let src = source(Arc::clone(&provider));
        let mut rx = src.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Watch sample at t=5s, then a poll result at t=3s arriving later.
        assert!(provider.push_watch_sample(Ok(Position::new(1.0, 1.0, 5_000))).await);
        rx.wait_for(|snap| snap.fix.is_some()).await.unwrap();
        assert_eq!(src.latest().unwrap().captured_at_ms, 5_000);

        provider.push_single_shot(Ok(Position::new(2.0, 2.0, 3_000)));
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(src.latest().unwrap().captured_at_ms, 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn reentrant_start_does_not_open_second_watch() {
        let provider = Arc::new(ScriptedLocationProvider::default());
        let src = source(Arc::clone(&provider));
        let _rx1 = src.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let _rx2 = src.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(provider.watch_count(), 1);
        assert!(src.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denied_ends_the_feed_once() {
        let provider = Arc::new(ScriptedLocationProvider::failing_watch(
            LocationError::PermissionDenied,
        ));
        let src = source(provider);
        let mut rx = src.start();

        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert!(snap.ended);
        assert!(matches!(
            snap.last,
            Some(LastEvent::Failure(LocationError::PermissionDenied))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_error_keeps_polling() {
        let provider = Arc::new(ScriptedLocationProvider::default());
        provider.push_single_shot(Err(LocationError::Timeout));
        provider.push_single_shot(Ok(Position::new(1.0, 2.0, 7_000)));

        let src = source(Arc::clone(&provider));
        let _rx = src.start();

        // First poll tick hits the timeout, the next one recovers.
        tokio::time::sleep(Duration::from_secs(7)).await;
        assert_eq!(src.latest().unwrap().captured_at_ms, 7_000);
        assert!(src.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_completes_open_streams() {
        use futures_util::StreamExt;

        let provider = Arc::new(ScriptedLocationProvider::default());
        let src = source(Arc::clone(&provider));
        let _rx = src.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let mut stream = Box::pin(src.stream());
        assert!(provider.push_watch_sample(Ok(Position::new(1.0, 1.0, 1_000))).await);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.captured_at_ms, 1_000);

        src.stop();
        assert!(stream.next().await.is_none());
        assert!(!src.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_opens_fresh_watch() {
        let provider = Arc::new(ScriptedLocationProvider::default());
        let src = source(Arc::clone(&provider));
        let _rx = src.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        src.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let _rx = src.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(provider.watch_count(), 2);
        assert!(src.latest().is_none());
    }
}
