use crate::delivery::Typewriter;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one question -> answer -> playback cycle. Async results carry
/// it so that a result for an abandoned turn can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    #[default]
    Idle,
    /// Waiting for the answer service.
    Submitting,
    /// Revealing the answer one character at a time.
    Typing,
    /// The synthesizer is reading the answer.
    Speaking,
    /// Settling before listening resumes.
    Cooldown,
}

impl TurnState {
    /// A turn in any of these states blocks new dispatches.
    pub fn is_busy(self) -> bool {
        self != TurnState::Idle
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::Idle => "idle",
            TurnState::Submitting => "submitting",
            TurnState::Typing => "typing",
            TurnState::Speaking => "speaking",
            TurnState::Cooldown => "cooldown",
        };
        f.write_str(name)
    }
}

/// The single in-flight turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub id: TurnId,
    pub question: String,
    /// Formatted answer, or the fallback message when delivery failed.
    pub answer: String,
    pub state: TurnState,
    pub(crate) typewriter: Option<Typewriter>,
    pub(crate) speech: String,
}

impl Turn {
    pub(crate) fn new(id: TurnId, question: String) -> Self {
        Self {
            id,
            question,
            answer: String::new(),
            state: TurnState::Submitting,
            typewriter: None,
            speech: String::new(),
        }
    }
}
