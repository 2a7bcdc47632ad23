//! intervoice - voice interview assistant
//!
//! Listens for interview questions, fetches answers from an answer service,
//! reveals them on screen and reads them aloud.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod defaults;
pub mod delivery;
pub mod error;
pub mod history;
pub mod ipc;
pub mod logging;
pub mod output;
pub mod recognition;
pub mod session;
pub mod speech;
pub mod sys;

// Core state machine
pub use controller::{Controller, Effect, Input, Mode, Presentation, Snapshot, UserAction};

// Seams (engine → controller → answer service / synthesizer / history)
pub use delivery::AnswerService;
pub use history::HistoryStore;
pub use recognition::SpeechEngine;
pub use speech::Synthesizer;

// Runtime
pub use session::{Presenter, Session, SessionHandle, SessionParts};

// Error handling
pub use error::{IntervoiceError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
