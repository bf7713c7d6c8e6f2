//! Voice keyword trigger: spotting over the speech stream.
//!
//! The watcher runs recognition in one language at a time, rotating
//! round-robin through the configured list on every stream end or
//! transient error (the platform recognizers stop themselves frequently,
//! so rotation doubles as restart). Every finalized utterance is matched
//! against the whole phrase table; the first match fires one
//! [`TriggerEvent`] and disarms the watcher until [`rearm`] — a single
//! shout must not open a pile of safety checks.
//!
//! Capability absence and permission denial degrade to observable states
//! ([`VoiceWatchState::Unsupported`] / [`VoiceWatchState::PermissionDenied`]),
//! never to a crash.
//!
//! [`rearm`]: VoiceTriggerHandle::rearm

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use raksha_core::domain::TriggerEvent;
use raksha_core::events::{EngineEvent, VoiceWatchState};
use raksha_core::ports::{
    Capability, Clock, EngineEventEmitter, PermissionGate, SpeechError, SpeechProvider,
    UtteranceEvent,
};
use raksha_core::settings::LanguageKeywords;

use super::match_keywords;

/// Configuration for the voice watcher.
#[derive(Debug, Clone)]
pub struct VoiceTriggerConfig {
    /// Languages in rotation order, with their trigger phrases.
    pub keywords: Vec<LanguageKeywords>,
    /// Delay before restarting recognition after a stream stop or error.
    pub restart_delay: Duration,
}

/// Handle to a running voice watcher.
pub struct VoiceTriggerHandle {
    fired: mpsc::Receiver<TriggerEvent>,
    state_rx: watch::Receiver<VoiceWatchState>,
    armed: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl VoiceTriggerHandle {
    /// Wait for the next trigger fire. Returns `None` once the watcher has
    /// shut down (stop, capability absence, permission denial).
    pub async fn recv(&mut self) -> Option<TriggerEvent> {
        self.fired.recv().await
    }

    /// Re-enable firing after a check resolved.
    pub fn rearm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Current watcher state.
    #[must_use]
    pub fn state(&self) -> VoiceWatchState {
        self.state_rx.borrow().clone()
    }

    /// Subscribe to watcher state changes.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<VoiceWatchState> {
        self.state_rx.clone()
    }

    /// Stop the watcher. Teardown of the recognition stream completes
    /// asynchronously underneath; no further events fire after this call.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for VoiceTriggerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Keyword-spotting trigger source.
pub struct VoiceTrigger;

impl VoiceTrigger {
    /// Spawn the watcher task.
    #[must_use]
    pub fn spawn(
        speech: Arc<dyn SpeechProvider>,
        permissions: Arc<dyn PermissionGate>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EngineEventEmitter>,
        config: VoiceTriggerConfig,
    ) -> VoiceTriggerHandle {
        let (fired_tx, fired) = mpsc::channel(4);
        let (state_tx, state_rx) = watch::channel(VoiceWatchState::Inactive);
        let armed = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();

        tokio::spawn(run_watcher(
            speech,
            permissions,
            clock,
            events,
            config,
            fired_tx,
            state_tx,
            Arc::clone(&armed),
            cancel.clone(),
        ));

        VoiceTriggerHandle {
            fired,
            state_rx,
            armed,
            cancel,
        }
    }
}

/// How one recognition session ended.
enum SessionEnd {
    /// Stream closed or hit a transient error: rotate language and restart.
    Rotate,
    /// Terminal capability loss: stop watching.
    Terminal(SpeechError),
    /// The watcher was stopped.
    Cancelled,
}

#[allow(clippy::too_many_arguments)]
async fn run_watcher(
    speech: Arc<dyn SpeechProvider>,
    permissions: Arc<dyn PermissionGate>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EngineEventEmitter>,
    config: VoiceTriggerConfig,
    fired_tx: mpsc::Sender<TriggerEvent>,
    state_tx: watch::Sender<VoiceWatchState>,
    armed: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let set_state = |state: VoiceWatchState| {
        let changed = state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
        if changed {
            events.emit(EngineEvent::VoiceWatchChanged { state });
        }
    };

    if !speech.is_available() {
        info!("Speech recognition unsupported on this platform, voice detection disabled");
        set_state(VoiceWatchState::Unsupported);
        return;
    }

    if !permissions.request(Capability::Microphone).await.is_granted() {
        warn!("Microphone permission denied, voice detection disabled");
        set_state(VoiceWatchState::PermissionDenied);
        return;
    }

    let languages: Vec<String> = config
        .keywords
        .iter()
        .map(|entry| entry.language.clone())
        .collect();
    if languages.is_empty() {
        set_state(VoiceWatchState::Unsupported);
        return;
    }

    let mut index = 0usize;
    loop {
        let language = languages[index].clone();
        set_state(VoiceWatchState::Listening {
            language: language.clone(),
        });

        let session = tokio::select! {
            () = cancel.cancelled() => break,
            result = speech.start_listening(&language) => result,
        };

        let end = match session {
            Err(error) if error.is_terminal() => SessionEnd::Terminal(error),
            Err(error) => {
                warn!(%language, %error, "Recognition start failed, will rotate");
                SessionEnd::Rotate
            }
            Ok(mut stream_rx) => {
                consume_session(
                    &mut stream_rx,
                    &config.keywords,
                    clock.as_ref(),
                    &fired_tx,
                    &armed,
                    &cancel,
                )
                .await
            }
        };

        match end {
            SessionEnd::Cancelled => break,
            SessionEnd::Terminal(error) => {
                warn!(%error, "Voice detection lost its capability");
                let state = match error {
                    SpeechError::PermissionDenied => VoiceWatchState::PermissionDenied,
                    _ => VoiceWatchState::Unsupported,
                };
                set_state(state);
                return;
            }
            SessionEnd::Rotate => {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = sleep(config.restart_delay) => {}
                }
                index = (index + 1) % languages.len();
                debug!(next_language = %languages[index], "Rotating recognition language");
            }
        }
    }

    set_state(VoiceWatchState::Inactive);
}

/// Consume one recognition stream until it ends.
async fn consume_session(
    stream_rx: &mut mpsc::Receiver<UtteranceEvent>,
    keywords: &[LanguageKeywords],
    clock: &dyn Clock,
    fired_tx: &mpsc::Sender<TriggerEvent>,
    armed: &AtomicBool,
    cancel: &CancellationToken,
) -> SessionEnd {
    loop {
        let item = tokio::select! {
            () = cancel.cancelled() => return SessionEnd::Cancelled,
            item = stream_rx.recv() => item,
        };

        match item {
            None => return SessionEnd::Rotate,
            Some(UtteranceEvent::Error(error)) if error.is_terminal() => {
                return SessionEnd::Terminal(error);
            }
            Some(UtteranceEvent::Error(error)) => {
                warn!(%error, "Transient recognition error, will rotate");
                return SessionEnd::Rotate;
            }
            Some(UtteranceEvent::Utterance { text, is_final }) => {
                if !is_final {
                    continue;
                }
                debug!(utterance = %text, "Finalized utterance");
                let Some(matched) = match_keywords(keywords, &text) else {
                    continue;
                };
                // One fire per arm: a single utterance producing several
                // partial matches must not open several checks.
                if armed
                    .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    debug!(phrase = %matched.phrase, "Trigger debounced, check still open");
                    continue;
                }
                info!(language = %matched.language, phrase = %matched.phrase, "Emergency keyword detected");
                let event =
                    TriggerEvent::voice(clock.now_ms(), matched.language, matched.phrase);
                if fired_tx.send(event).await.is_err() {
                    return SessionEnd::Cancelled;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raksha_core::domain::TriggerOrigin;
    use raksha_core::settings::default_keywords;
    use raksha_core::stubs::{
        FixedClock, RecordingEmitter, ScriptedSpeechProvider, SpeechScript, StubPermissionGate,
    };

    fn config(langs: &[(&str, &[&str])]) -> VoiceTriggerConfig {
        VoiceTriggerConfig {
            keywords: langs
                .iter()
                .map(|&(lang, phrases)| LanguageKeywords::new(lang, phrases))
                .collect(),
            restart_delay: Duration::from_millis(1_000),
        }
    }

    fn spawn(
        speech: ScriptedSpeechProvider,
        permissions: StubPermissionGate,
        cfg: VoiceTriggerConfig,
    ) -> (VoiceTriggerHandle, Arc<RecordingEmitter>) {
        let emitter = Arc::new(RecordingEmitter::default());
        let handle = VoiceTrigger::spawn(
            Arc::new(speech),
            Arc::new(permissions),
            Arc::new(FixedClock::at(5_000)),
            Arc::clone(&emitter) as Arc<dyn EngineEventEmitter>,
            cfg,
        );
        (handle, emitter)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_on_keyword_and_debounces() {
        let speech = ScriptedSpeechProvider::with_scripts(vec![SpeechScript::Utterances(vec![
            UtteranceEvent::Utterance {
                text: "someone help me".to_string(),
                is_final: true,
            },
            UtteranceEvent::Utterance {
                text: "help help help".to_string(),
                is_final: true,
            },
        ])]);
        let (mut handle, _emitter) = spawn(
            speech,
            StubPermissionGate::allow_all(),
            config(&[("en-US", &["help"])]),
        );

        let event = handle.recv().await.unwrap();
        assert_eq!(event.origin, TriggerOrigin::Voice);
        assert_eq!(event.voice_match.unwrap().phrase, "help");

        // Second matching utterance while disarmed: nothing queued.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.fired.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_allows_the_next_fire() {
        let speech = ScriptedSpeechProvider::with_scripts(vec![
            SpeechScript::Utterances(vec![UtteranceEvent::Utterance {
                text: "help".to_string(),
                is_final: true,
            }]),
            SpeechScript::Utterances(vec![UtteranceEvent::Utterance {
                text: "emergency".to_string(),
                is_final: true,
            }]),
        ]);
        let (mut handle, _emitter) = spawn(
            speech,
            StubPermissionGate::allow_all(),
            config(&[("en-US", &["help", "emergency"])]),
        );

        let first = handle.recv().await.unwrap();
        assert_eq!(first.voice_match.unwrap().phrase, "help");

        handle.rearm();
        let second = handle.recv().await.unwrap();
        assert_eq!(second.voice_match.unwrap().phrase, "emergency");
    }

    #[tokio::test(start_paused = true)]
    async fn partial_results_do_not_fire() {
        let speech = ScriptedSpeechProvider::with_scripts(vec![SpeechScript::Utterances(vec![
            UtteranceEvent::Utterance {
                text: "help".to_string(),
                is_final: false,
            },
        ])]);
        let (mut handle, _emitter) = spawn(
            speech,
            StubPermissionGate::allow_all(),
            config(&[("en-US", &["help"])]),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.fired.try_recv().is_err());
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn rotates_languages_round_robin_on_stream_end() {
        // Empty script queue: every session opens and closes immediately.
        let speech = ScriptedSpeechProvider::with_scripts(vec![]);
        let speech = Arc::new(speech);
        let emitter = Arc::new(RecordingEmitter::default());
        let handle = VoiceTrigger::spawn(
            Arc::clone(&speech) as Arc<dyn SpeechProvider>,
            Arc::new(StubPermissionGate::allow_all()),
            Arc::new(FixedClock::at(0)),
            Arc::clone(&emitter) as Arc<dyn EngineEventEmitter>,
            config(&[("en-US", &["help"]), ("hi-IN", &["मदद"]), ("te-IN", &["సాయం"])]),
        );

        // Four sessions: en → hi → te → wrap back to en.
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        handle.stop();

        let requested = speech.requested_languages();
        assert!(requested.len() >= 4, "expected ≥4 sessions, got {requested:?}");
        assert_eq!(&requested[..4], &["en-US", "hi-IN", "te-IN", "en-US"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_platform_is_an_observable_noop() {
        let (mut handle, emitter) = spawn(
            ScriptedSpeechProvider::unavailable(),
            StubPermissionGate::allow_all(),
            config(&[("en-US", &["help"])]),
        );

        assert!(handle.recv().await.is_none());
        assert_eq!(handle.state(), VoiceWatchState::Unsupported);
        assert_eq!(emitter.count_of("voice:state_changed"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn microphone_denial_disables_detection_visibly() {
        let (mut handle, _emitter) = spawn(
            ScriptedSpeechProvider::with_scripts(vec![]),
            StubPermissionGate::denying(Capability::Microphone),
            config(&[("en-US", &["help"])]),
        );

        assert!(handle.recv().await.is_none());
        assert_eq!(handle.state(), VoiceWatchState::PermissionDenied);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_stream_error_stops_the_watcher() {
        let speech = ScriptedSpeechProvider::with_scripts(vec![SpeechScript::StartFails(
            SpeechError::PermissionDenied,
        )]);
        let (mut handle, _emitter) = spawn(
            speech,
            StubPermissionGate::allow_all(),
            config(&[("en-US", &["help"])]),
        );

        assert!(handle.recv().await.is_none());
        assert_eq!(handle.state(), VoiceWatchState::PermissionDenied);
    }

    #[tokio::test(start_paused = true)]
    async fn default_table_spots_all_six_languages() {
        let cfg = VoiceTriggerConfig {
            keywords: default_keywords(),
            restart_delay: Duration::from_millis(1_000),
        };
        let speech = ScriptedSpeechProvider::with_scripts(vec![SpeechScript::Utterances(vec![
            UtteranceEvent::Utterance {
                text: "বাঁচাও".to_string(),
                is_final: true,
            },
        ])]);
        let (mut handle, _emitter) = spawn(speech, StubPermissionGate::allow_all(), cfg);

        let event = handle.recv().await.unwrap();
        assert_eq!(event.voice_match.unwrap().language, "bn-IN");
    }
}
