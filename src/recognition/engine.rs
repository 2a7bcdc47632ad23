//! Speech-to-text engine abstraction and the typed events it emits.

use super::error::RecognitionError;
use async_trait::async_trait;
use std::fmt;
use std::time::Instant;

/// One chunk of transcribed speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptFragment {
    pub text: String,
    pub is_final: bool,
    pub captured_at: Instant,
}

impl TranscriptFragment {
    pub fn new(text: impl Into<String>, is_final: bool, captured_at: Instant) -> Self {
        Self {
            text: text.into(),
            is_final,
            captured_at,
        }
    }

    pub fn final_at(text: impl Into<String>, captured_at: Instant) -> Self {
        Self::new(text, true, captured_at)
    }

    pub fn interim_at(text: impl Into<String>, captured_at: Instant) -> Self {
        Self::new(text, false, captured_at)
    }
}

/// Everything an engine can tell the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Capture is running.
    Started,
    Fragment(TranscriptFragment),
    /// The engine stopped on its own (end of utterance, silence timeout).
    Ended,
    /// The engine reported an error code.
    Error(EngineErrorCode),
    /// `SpeechEngine::start` itself failed.
    StartFailed(RecognitionError),
}

/// Engine-level error codes, named after the Web Speech API values that
/// external recognizers report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineErrorCode {
    NoSpeech,
    AudioCapture,
    NotAllowed,
    ServiceNotAllowed,
    Network,
    Aborted,
    Other(String),
}

impl EngineErrorCode {
    /// Parse a reported code. Unknown codes are kept verbatim.
    pub fn parse(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "no-speech" => Self::NoSpeech,
            "audio-capture" => Self::AudioCapture,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            other => Self::Other(other.to_string()),
        }
    }

    /// Map onto the recognition taxonomy. `None` means benign.
    ///
    /// `aborted` is what engines report when they are stopped on purpose,
    /// e.g. during a restart, so it never counts as a failure.
    pub fn classify(&self) -> Option<RecognitionError> {
        match self {
            Self::NoSpeech => Some(RecognitionError::NoSpeechDetected),
            Self::AudioCapture => Some(RecognitionError::AudioCaptureFailure {
                message: "the engine could not capture audio".to_string(),
            }),
            Self::NotAllowed | Self::ServiceNotAllowed => Some(RecognitionError::PermissionDenied),
            Self::Network => Some(RecognitionError::Transient {
                message: "network error".to_string(),
            }),
            Self::Aborted => None,
            Self::Other(code) => Some(RecognitionError::Transient {
                message: format!("engine error '{}'", code),
            }),
        }
    }
}

impl fmt::Display for EngineErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Self::NoSpeech => "no-speech",
            Self::AudioCapture => "audio-capture",
            Self::NotAllowed => "not-allowed",
            Self::ServiceNotAllowed => "service-not-allowed",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::Other(code) => code,
        };
        f.write_str(code)
    }
}

/// A continuous, interim-capable speech-to-text engine.
///
/// Engines report what they hear as [`RecognitionEvent`]s on the channel
/// they were built with; these methods only control capture.
#[async_trait]
pub trait SpeechEngine: Send {
    /// Begin continuous recognition with interim results.
    async fn start(&mut self) -> Result<(), RecognitionError>;

    /// Halt capture. Idempotent.
    async fn stop(&mut self);

    /// Engine name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_codes() {
        assert_eq!(EngineErrorCode::parse("no-speech"), EngineErrorCode::NoSpeech);
        assert_eq!(
            EngineErrorCode::parse(" Audio-Capture "),
            EngineErrorCode::AudioCapture
        );
        assert_eq!(
            EngineErrorCode::parse("service-not-allowed"),
            EngineErrorCode::ServiceNotAllowed
        );
        assert_eq!(
            EngineErrorCode::parse("bad-grammar"),
            EngineErrorCode::Other("bad-grammar".to_string())
        );
    }

    #[test]
    fn classify_maps_onto_taxonomy() {
        assert_eq!(
            EngineErrorCode::NoSpeech.classify(),
            Some(RecognitionError::NoSpeechDetected)
        );
        assert_eq!(
            EngineErrorCode::NotAllowed.classify(),
            Some(RecognitionError::PermissionDenied)
        );
        assert!(matches!(
            EngineErrorCode::AudioCapture.classify(),
            Some(RecognitionError::AudioCaptureFailure { .. })
        ));
        assert!(matches!(
            EngineErrorCode::Network.classify(),
            Some(RecognitionError::Transient { .. })
        ));
        assert!(matches!(
            EngineErrorCode::Other("x".into()).classify(),
            Some(RecognitionError::Transient { .. })
        ));
        assert_eq!(EngineErrorCode::Aborted.classify(), None);
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for code in ["no-speech", "audio-capture", "not-allowed", "network", "aborted"] {
            assert_eq!(EngineErrorCode::parse(code).to_string(), code);
        }
    }
}
