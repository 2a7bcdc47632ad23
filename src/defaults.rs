//! Default configuration constants for intervoice.
//!
//! Shared by the configuration types and the voice controller so that the
//! two never drift apart.

/// Default base URL of the answer service.
pub const SERVICE_URL: &str = "http://127.0.0.1:8000";

/// Path of the one-shot question endpoint, relative to the service URL.
pub const ASK_PATH: &str = "/ask";

/// Path of the persistent duplex channel, relative to the service URL.
pub const WS_PATH: &str = "/ws";

/// Default request timeout for the answer service in milliseconds.
pub const REQUEST_TIMEOUT_MS: u64 = 30_000;

/// A fragment must be strictly longer than this (in characters, trimmed)
/// to count as a question.
pub const MIN_QUESTION_CHARS: usize = 10;

/// Interim fragments longer than this look complete enough to schedule the
/// interim dispatch path.
pub const INTERIM_COMPLETE_CHARS: usize = 20;

/// A shorter fragment contained in the last accepted question is treated as
/// a truncated echo when its length is below this share of the last one.
pub const DUPLICATE_RATIO: f32 = 0.7;

/// Delay after a final fragment before dispatch, letting trailing words land.
pub const FINAL_DEBOUNCE_MS: u64 = 1200;

/// Delay after a complete-looking interim fragment before dispatch.
pub const INTERIM_DEBOUNCE_MS: u64 = 2500;

/// Upper bound on how long a detected question may wait for dispatch.
pub const FALLBACK_MS: u64 = 4000;

/// Typewriter reveal interval per character.
pub const TYPEWRITER_MS: u64 = 30;

/// Settle interval between the end of playback and the next listening turn.
pub const COOLDOWN_MS: u64 = 500;

/// Recognition language tag handed to speech engines.
pub const RECOGNITION_LANGUAGE: &str = "en-US";

/// Consecutive recognition failures tolerated before giving up.
pub const MAX_RESTART_ATTEMPTS: u32 = 3;

/// Base delay for recognition restarts; doubled per consecutive failure.
pub const RESTART_BACKOFF_MS: u64 = 300;

/// Answer speech rate (1.0 = engine default).
pub const SPEECH_RATE: f32 = 0.9;

/// Answer speech pitch (1.0 = engine default).
pub const SPEECH_PITCH: f32 = 1.0;

/// Answer speech volume (0.0 to 1.0).
pub const SPEECH_VOLUME: f32 = 0.8;

/// User-visible answer text when the answer service cannot be reached.
pub const CONNECTION_FAILED_MESSAGE: &str =
    "Connection failed. Please ensure the server is running.";

/// User-visible answer text when the answer service replies with garbage.
pub const GENERIC_FAILURE_MESSAGE: &str = "Error occurred. Please retry.";

/// Spoken when live mode starts.
pub const LIVE_STARTED_ANNOUNCEMENT: &str =
    "Live mode activated. Continuous listening ready for interview questions.";

/// Spoken when live mode ends.
pub const LIVE_ENDED_ANNOUNCEMENT: &str = "Live mode deactivated. Continuous listening stopped.";

/// Spoken after each answer in live mode.
pub const READY_ANNOUNCEMENT: &str = "Ready for next question";
