use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-wide listening mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No recognition active.
    #[default]
    Idle,
    /// Push-to-talk: the user starts and stops capture.
    Manual,
    /// Continuous: capture restarts after every utterance and every turn.
    Live,
}

impl Mode {
    pub fn is_live(self) -> bool {
        self == Mode::Live
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "idle",
            Mode::Manual => "manual",
            Mode::Live => "live",
        };
        f.write_str(name)
    }
}
