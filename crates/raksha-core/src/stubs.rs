//! Stub capability implementations for tests and demos.
//!
//! These are deliberately simple, scriptable stand-ins for the platform
//! ports — the engine must be fully exercisable without a device. Real
//! providers replace them without the engine noticing.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::domain::{Position, RideLogEntry, RideStatus, TrustedContact};
use crate::events::EngineEvent;
use crate::ports::{
    Capability, Clock, ContactStore, ContactStoreError, EngineEventEmitter, LocationError,
    LocationProvider, Notifier, NotifyError, PermissionDecision, PermissionGate, RideLogError,
    RideLogSink, SpeechError, SpeechProvider, UtteranceEvent, WatchOptions,
};

// ── Clock ──────────────────────────────────────────────────────────

/// Clock pinned to a settable instant.
#[derive(Debug, Default)]
pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    /// Create a clock at the given epoch millisecond.
    #[must_use]
    pub fn at(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    /// Move the clock forward.
    pub fn advance_ms(&self, delta: i64) {
        self.now_ms.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

// ── Event emitter ──────────────────────────────────────────────────

/// Emitter that records every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingEmitter {
    /// Snapshot of everything emitted so far.
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().expect("emitter lock").clone()
    }

    /// Count of events with the given wire name.
    #[must_use]
    pub fn count_of(&self, event_name: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| e.event_name() == event_name)
            .count()
    }
}

impl EngineEventEmitter for RecordingEmitter {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().expect("emitter lock").push(event);
    }
}

// ── Permission gate ────────────────────────────────────────────────

/// Gate with a per-capability decision table; unlisted capabilities are
/// granted.
#[derive(Debug, Default)]
pub struct StubPermissionGate {
    denied: HashSet<Capability>,
}

impl StubPermissionGate {
    /// Gate that grants everything.
    #[must_use]
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Deny one capability.
    #[must_use]
    pub fn denying(capability: Capability) -> Self {
        Self {
            denied: HashSet::from([capability]),
        }
    }
}

#[async_trait]
impl PermissionGate for StubPermissionGate {
    async fn request(&self, capability: Capability) -> PermissionDecision {
        if self.denied.contains(&capability) {
            PermissionDecision::Denied
        } else {
            PermissionDecision::Granted
        }
    }
}

// ── Contact store ──────────────────────────────────────────────────

/// In-memory contact snapshot.
#[derive(Debug, Default)]
pub struct StaticContactStore {
    contacts: Vec<TrustedContact>,
}

impl StaticContactStore {
    /// Store holding the given contacts.
    #[must_use]
    pub fn new(contacts: Vec<TrustedContact>) -> Self {
        Self { contacts }
    }

    /// The demo contact pair used by examples and integration tests.
    #[must_use]
    pub fn with_demo_contacts() -> Self {
        Self::new(vec![
            TrustedContact::new("contact1", "Emergency Contact", "9876543210")
                .expect("demo contact"),
            TrustedContact::new("contact2", "Family Member", "8765432109").expect("demo contact"),
        ])
    }
}

#[async_trait]
impl ContactStore for StaticContactStore {
    async fn list_contacts(&self) -> Result<Vec<TrustedContact>, ContactStoreError> {
        Ok(self.contacts.clone())
    }
}

// ── Notifier ───────────────────────────────────────────────────────

/// Notifier that records sends and dials, with scriptable failures.
#[derive(Debug)]
pub struct StubNotifier {
    supported: bool,
    fail_numbers: Vec<String>,
    sent: Mutex<Vec<(String, String)>>,
    dialed: Mutex<Vec<String>>,
}

impl Default for StubNotifier {
    fn default() -> Self {
        Self {
            supported: true,
            fail_numbers: Vec::new(),
            sent: Mutex::new(Vec::new()),
            dialed: Mutex::new(Vec::new()),
        }
    }
}

impl StubNotifier {
    /// Notifier where every send succeeds.
    #[must_use]
    pub fn reliable() -> Self {
        Self::default()
    }

    /// Notifier reporting no text capability.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::default()
        }
    }

    /// Notifier that fails sends to the given numbers.
    #[must_use]
    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            fail_numbers: numbers.iter().map(ToString::to_string).collect(),
            ..Self::default()
        }
    }

    /// All `(phone, body)` pairs delivered so far.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("notifier lock").clone()
    }

    /// All numbers dialed so far.
    #[must_use]
    pub fn dialed(&self) -> Vec<String> {
        self.dialed.lock().expect("notifier lock").clone()
    }
}

#[async_trait]
impl Notifier for StubNotifier {
    fn can_send_text(&self) -> bool {
        self.supported
    }

    async fn send_text(&self, phone_number: &str, body: &str) -> Result<(), NotifyError> {
        if !self.supported {
            return Err(NotifyError::Unsupported);
        }
        if self.fail_numbers.iter().any(|n| n == phone_number) {
            return Err(NotifyError::SendFailed(format!(
                "scripted failure for {phone_number}"
            )));
        }
        self.sent
            .lock()
            .expect("notifier lock")
            .push((phone_number.to_string(), body.to_string()));
        Ok(())
    }

    async fn dial(&self, number: &str) -> Result<(), NotifyError> {
        self.dialed
            .lock()
            .expect("notifier lock")
            .push(number.to_string());
        Ok(())
    }
}

// ── Location provider ──────────────────────────────────────────────

/// Location provider with a live push channel for watch samples and a
/// scripted queue for single-shot fixes.
#[derive(Debug, Default)]
pub struct ScriptedLocationProvider {
    watch_tx: Mutex<Option<mpsc::Sender<Result<Position, LocationError>>>>,
    single_shots: Mutex<VecDeque<Result<Position, LocationError>>>,
    watch_count: AtomicUsize,
    watch_error: Mutex<Option<LocationError>>,
}

impl ScriptedLocationProvider {
    /// Provider whose `watch` calls fail with the given error.
    #[must_use]
    pub fn failing_watch(error: LocationError) -> Self {
        let provider = Self::default();
        *provider.watch_error.lock().expect("provider lock") = Some(error);
        provider
    }

    /// Queue a single-shot `current()` result.
    pub fn push_single_shot(&self, sample: Result<Position, LocationError>) {
        self.single_shots
            .lock()
            .expect("provider lock")
            .push_back(sample);
    }

    /// Push a sample into the live watch channel, if a watch is running.
    ///
    /// Returns false when no watcher is subscribed.
    pub async fn push_watch_sample(&self, sample: Result<Position, LocationError>) -> bool {
        let tx = self.watch_tx.lock().expect("provider lock").clone();
        match tx {
            Some(tx) => tx.send(sample).await.is_ok(),
            None => false,
        }
    }

    /// How many watch subscriptions were ever opened.
    #[must_use]
    pub fn watch_count(&self) -> usize {
        self.watch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocationProvider {
    async fn watch(
        &self,
        _options: WatchOptions,
    ) -> Result<mpsc::Receiver<Result<Position, LocationError>>, LocationError> {
        if let Some(error) = self.watch_error.lock().expect("provider lock").clone() {
            return Err(error);
        }
        let (tx, rx) = mpsc::channel(16);
        *self.watch_tx.lock().expect("provider lock") = Some(tx);
        self.watch_count.fetch_add(1, Ordering::SeqCst);
        Ok(rx)
    }

    async fn current(&self, _options: WatchOptions) -> Result<Position, LocationError> {
        self.single_shots
            .lock()
            .expect("provider lock")
            .pop_front()
            .unwrap_or(Err(LocationError::Unavailable(
                "no scripted fix".to_string(),
            )))
    }
}

// ── Speech provider ────────────────────────────────────────────────

/// One scripted recognition session.
#[derive(Debug, Clone)]
pub enum SpeechScript {
    /// Deliver these events, then close the stream (normal stop).
    Utterances(Vec<UtteranceEvent>),
    /// Fail the `start_listening` call itself.
    StartFails(SpeechError),
}

/// Speech provider that replays scripted sessions and records the
/// requested language order.
#[derive(Debug)]
pub struct ScriptedSpeechProvider {
    available: bool,
    scripts: Mutex<VecDeque<SpeechScript>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedSpeechProvider {
    /// Provider with a queue of sessions; when the queue runs dry, streams
    /// open and close immediately (endless silent rotation).
    #[must_use]
    pub fn with_scripts(scripts: Vec<SpeechScript>) -> Self {
        Self {
            available: true,
            scripts: Mutex::new(scripts.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Provider reporting no recognition capability.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            available: false,
            scripts: Mutex::new(VecDeque::new()),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Languages requested so far, in order.
    #[must_use]
    pub fn requested_languages(&self) -> Vec<String> {
        self.requested.lock().expect("speech lock").clone()
    }
}

#[async_trait]
impl SpeechProvider for ScriptedSpeechProvider {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn start_listening(
        &self,
        language: &str,
    ) -> Result<mpsc::Receiver<UtteranceEvent>, SpeechError> {
        self.requested
            .lock()
            .expect("speech lock")
            .push(language.to_string());

        let script = self.scripts.lock().expect("speech lock").pop_front();
        match script {
            Some(SpeechScript::StartFails(error)) => Err(error),
            Some(SpeechScript::Utterances(events)) => {
                let (tx, rx) = mpsc::channel(16);
                tokio::spawn(async move {
                    for event in events {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    // Sender drops here; the stream closes like a platform stop.
                });
                Ok(rx)
            }
            None => {
                let (_tx, rx) = mpsc::channel(1);
                Ok(rx)
            }
        }
    }
}

// ── Ride log ───────────────────────────────────────────────────────

/// Audit sink that records rows in memory.
#[derive(Debug, Default)]
pub struct RecordingRideLog {
    rows: Mutex<Vec<RideLogEntry>>,
    updates: Mutex<Vec<(Uuid, RideStatus)>>,
}

impl RecordingRideLog {
    /// All recorded rows.
    #[must_use]
    pub fn rows(&self) -> Vec<RideLogEntry> {
        self.rows.lock().expect("ride log lock").clone()
    }

    /// All status updates, in order.
    #[must_use]
    pub fn updates(&self) -> Vec<(Uuid, RideStatus)> {
        self.updates.lock().expect("ride log lock").clone()
    }
}

#[async_trait]
impl RideLogSink for RecordingRideLog {
    async fn record(&self, entry: RideLogEntry) -> Result<(), RideLogError> {
        self.rows.lock().expect("ride log lock").push(entry);
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: RideStatus) -> Result<(), RideLogError> {
        self.updates.lock().expect("ride log lock").push((id, status));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_notifier_records_and_fails_on_script() {
        let notifier = StubNotifier::failing_for(&["9999999999"]);
        notifier.send_text("9876543210", "hello").await.unwrap();
        assert!(notifier.send_text("9999999999", "hello").await.is_err());
        notifier.dial("100").await.unwrap();

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.dialed(), vec!["100".to_string()]);
    }

    #[tokio::test]
    async fn permission_gate_denies_scripted_capability() {
        let gate = StubPermissionGate::denying(Capability::Microphone);
        assert!(!gate.request(Capability::Microphone).await.is_granted());
        assert!(gate.request(Capability::Location).await.is_granted());
    }

    #[tokio::test]
    async fn scripted_location_pushes_watch_samples() {
        let provider = ScriptedLocationProvider::default();
        assert!(!provider.push_watch_sample(Ok(Position::new(0.0, 0.0, 1))).await);

        let mut rx = provider.watch(WatchOptions::default()).await.unwrap();
        assert!(provider.push_watch_sample(Ok(Position::new(0.0, 0.0, 2))).await);
        let sample = rx.recv().await.unwrap().unwrap();
        assert_eq!(sample.captured_at_ms, 2);
        assert_eq!(provider.watch_count(), 1);
    }

    #[tokio::test]
    async fn scripted_speech_records_language_order() {
        let provider = ScriptedSpeechProvider::with_scripts(vec![SpeechScript::Utterances(vec![])]);
        let mut rx = provider.start_listening("en-US").await.unwrap();
        assert!(rx.recv().await.is_none());
        assert_eq!(provider.requested_languages(), vec!["en-US".to_string()]);
    }

    #[test]
    fn demo_contacts_are_normalized() {
        let store = StaticContactStore::with_demo_contacts();
        assert_eq!(store.contacts.len(), 2);
        assert_eq!(store.contacts[0].phone_number, "9876543210");
    }
}
