//! Engine for recognizers that run outside this process.
//!
//! A [`FeedEngine`] is the controller-facing half: starting and stopping it
//! opens and closes a listening gate. The [`EngineFeed`] half is handed to
//! whatever produces transcripts (terminal input, the IPC socket) and posts
//! events through the gate.

use super::engine::{EngineErrorCode, RecognitionEvent, SpeechEngine, TranscriptFragment};
use super::error::RecognitionError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;

/// Create a connected engine/feed pair delivering events on `events`.
pub fn feed_engine(
    name: &'static str,
    events: mpsc::UnboundedSender<RecognitionEvent>,
) -> (FeedEngine, EngineFeed) {
    let listening = Arc::new(AtomicBool::new(false));
    let engine = FeedEngine {
        name,
        listening: Arc::clone(&listening),
        events: events.clone(),
    };
    let feed = EngineFeed { listening, events };
    (engine, feed)
}

pub struct FeedEngine {
    name: &'static str,
    listening: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
}

#[async_trait]
impl SpeechEngine for FeedEngine {
    async fn start(&mut self) -> Result<(), RecognitionError> {
        if self.events.is_closed() {
            return Err(RecognitionError::EngineUnavailable {
                reason: format!("{} event channel is closed", self.name),
            });
        }
        self.listening.store(true, Ordering::SeqCst);
        self.events
            .send(RecognitionEvent::Started)
            .map_err(|_| RecognitionError::EngineUnavailable {
                reason: format!("{} event channel is closed", self.name),
            })
    }

    async fn stop(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Producer handle for a [`FeedEngine`]. Cheap to clone.
#[derive(Clone)]
pub struct EngineFeed {
    listening: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<RecognitionEvent>,
}

impl EngineFeed {
    /// Whether the engine is currently capturing.
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Post a transcript fragment. Returns `false` when it was dropped
    /// because the engine is not listening or the text is blank.
    pub fn post(&self, text: &str, is_final: bool) -> bool {
        if !self.is_listening() || text.trim().is_empty() {
            return false;
        }
        let fragment = TranscriptFragment::new(text, is_final, Instant::now());
        self.events
            .send(RecognitionEvent::Fragment(fragment))
            .is_ok()
    }

    /// Report that the recognizer stopped on its own.
    pub fn ended(&self) -> bool {
        if !self.listening.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.events.send(RecognitionEvent::Ended).is_ok()
    }

    /// Report an engine error code.
    pub fn error(&self, code: EngineErrorCode) -> bool {
        if !self.is_listening() {
            return false;
        }
        self.events.send(RecognitionEvent::Error(code)).is_ok()
    }
}
