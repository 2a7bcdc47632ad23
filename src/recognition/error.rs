//! Recognition-side error taxonomy.

use thiserror::Error;

/// Errors surfaced by the recognition manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("microphone access was denied")]
    PermissionDenied,

    #[error("speech recognition is unavailable: {reason}")]
    EngineUnavailable { reason: String },

    #[error("no speech was detected")]
    NoSpeechDetected,

    #[error("audio capture failed: {message}")]
    AudioCaptureFailure { message: String },

    #[error("transient recognition failure: {message}")]
    Transient { message: String },
}

impl RecognitionError {
    /// Errors that force the mode controller back to `Idle`.
    pub fn is_mode_ending(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::AudioCaptureFailure { .. }
                | Self::EngineUnavailable { .. }
        )
    }
}
