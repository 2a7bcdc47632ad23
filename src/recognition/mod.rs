//! Speech recognition: engine abstraction, external-recognizer feed and the
//! restart supervisor.

pub mod engine;
pub mod error;
pub mod feed;
pub mod manager;

pub use engine::{EngineErrorCode, RecognitionEvent, SpeechEngine, TranscriptFragment};
pub use error::RecognitionError;
pub use feed::{EngineFeed, FeedEngine, feed_engine};
pub use manager::{EndAction, ErrorAction, ManagerState, RecognitionManager};
