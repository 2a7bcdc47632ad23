//! Speech synthesis: the synthesizer abstraction, voice parameters and the
//! user's audio switch.

pub mod command;

pub use command::{CommandSynthesizer, TtsProgram};

use crate::config::SpeechConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::Notify;

/// Speech synthesis failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Playback was cancelled. Expected during mode switches.
    #[error("speech was interrupted")]
    Interrupted,

    #[error("no speech synthesizer available: {message}")]
    Unavailable { message: String },

    #[error("speech synthesis failed: {message}")]
    Failed { message: String },
}

/// Rate, pitch and volume handed to the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// 1.0 is the engine's normal speed.
    pub rate: f32,
    /// 1.0 is the engine's normal pitch.
    pub pitch: f32,
    /// 0.0 to 1.0.
    pub volume: f32,
}

impl VoiceParams {
    /// Quick, quiet voice for the between-turn cue.
    pub const READY: VoiceParams = VoiceParams {
        rate: 1.2,
        pitch: 1.0,
        volume: 0.4,
    };

    /// Mode change announcements.
    pub const NOTICE: VoiceParams = VoiceParams {
        rate: 1.0,
        pitch: 1.0,
        volume: 0.6,
    };
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::from(&SpeechConfig::default())
    }
}

impl From<&SpeechConfig> for VoiceParams {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

/// The user's audio-enabled switch. Shared; the controller only reads it.
#[derive(Debug, Clone)]
pub struct AudioToggle(Arc<AtomicBool>);

impl AudioToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Returns the previous value.
    pub fn set(&self, enabled: bool) -> bool {
        self.0.swap(enabled, Ordering::SeqCst)
    }
}

/// A text-to-speech engine.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speak `text`, resolving when playback completes.
    async fn speak(&self, text: &str, voice: &VoiceParams) -> Result<(), SynthesisError>;

    /// Interrupt current playback; the pending `speak` returns `Interrupted`.
    fn cancel(&self);

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Synthesizer + ?Sized> Synthesizer for Arc<T> {
    async fn speak(&self, text: &str, voice: &VoiceParams) -> Result<(), SynthesisError> {
        (**self).speak(text, voice).await
    }

    fn cancel(&self) {
        (**self).cancel()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock synthesizer for testing
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    spoken: Mutex<Vec<(String, VoiceParams)>>,
    failure: Option<SynthesisError>,
    hold: bool,
    cancelled: Notify,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the mock to fail every request
    pub fn with_failure(mut self, error: SynthesisError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Keep "speaking" until cancelled.
    pub fn holding(mut self) -> Self {
        self.hold = true;
        self
    }

    /// Texts spoken so far, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .map(|spoken| spoken.iter().map(|(text, _)| text.clone()).collect())
            .unwrap_or_default()
    }

    pub fn spoken_with_voice(&self) -> Vec<(String, VoiceParams)> {
        self.spoken
            .lock()
            .map(|spoken| spoken.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn speak(&self, text: &str, voice: &VoiceParams) -> Result<(), SynthesisError> {
        let cancelled = self.cancelled.notified();
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push((text.to_string(), *voice));
        }
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        if self.hold {
            cancelled.await;
            return Err(SynthesisError::Interrupted);
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }

    fn name(&self) -> &str {
        "mock"
    }
}
