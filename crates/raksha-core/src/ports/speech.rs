//! Speech recognition provider port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Items on a recognition stream.
///
/// The stream closes when recognition stops (platform end-of-stream or
/// `stop` on the provider side). A mid-stream failure surfaces as one
/// terminal [`UtteranceEvent::Error`] item before the channel closes, so
/// consumers see the reason instead of a silent hangup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    /// One recognized utterance.
    Utterance {
        /// The transcript text.
        text: String,
        /// Whether this is a finalized result or a partial hypothesis.
        is_final: bool,
    },
    /// Recognition failed; the stream ends after this item.
    Error(SpeechError),
}

/// Errors from the speech provider.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechError {
    /// The user denied microphone access. Terminal for the capability.
    #[error("Microphone permission denied")]
    PermissionDenied,

    /// No recognition capability exists on this platform.
    #[error("Speech recognition not supported on this platform")]
    Unsupported,

    /// The recognizer gave up on the current stream. Transient; the caller
    /// restarts on its own cadence.
    #[error("Recognition failed: {0}")]
    Recognition(String),

    /// Network-backed recognition lost connectivity. Transient.
    #[error("Recognition network error: {0}")]
    Network(String),
}

impl SpeechError {
    /// Whether the error permanently disables voice detection.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::Unsupported)
    }
}

/// Port for streaming speech recognition, one language at a time.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Whether a real recognition capability exists.
    ///
    /// Callers must query this before listening; on platforms without one,
    /// the voice trigger degrades to an explicit no-op instead of crashing.
    fn is_available(&self) -> bool;

    /// Start recognizing in the given BCP-47 language.
    ///
    /// Dropping the receiver stops the underlying recognizer.
    async fn start_listening(
        &self,
        language: &str,
    ) -> Result<mpsc::Receiver<UtteranceEvent>, SpeechError>;
}
