//! Newline-delimited JSON protocol spoken on the daemon socket.
//!
//! Clients are the CLI and external recognizers (a browser bridge or a
//! separate speech-to-text process) that stream transcript fragments.

use crate::controller::Snapshot;
use serde::{Deserialize, Serialize};

/// Commands sent to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Transcript fragment from an external recognizer
    Fragment {
        text: String,
        #[serde(default)]
        is_final: bool,
    },
    /// The external recognizer stopped on its own
    EngineEnded,
    /// The external recognizer failed (Web Speech error name)
    EngineError { code: String },
    /// Enter manual mode and start capture
    Start,
    /// Stop manual capture and send what was heard
    Stop,
    Live,
    EndLive,
    /// Send the pending question now
    Send,
    /// Typed question
    Ask { question: String },
    Audio { enabled: bool },
    Status,
    Shutdown,
}

impl Command {
    /// Serialize command to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize command from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Responses sent by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Ok,
    Status(Snapshot),
    Error { message: String },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    /// Serialize response to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize response from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Mode, TurnState};

    #[test]
    fn test_unit_commands_use_snake_case_tags() {
        assert_eq!(Command::EndLive.to_json().unwrap(), r#"{"type":"end_live"}"#);
        assert_eq!(
            Command::EngineEnded.to_json().unwrap(),
            r#"{"type":"engine_ended"}"#
        );
    }

    #[test]
    fn test_fragment_defaults_to_interim() {
        let cmd = Command::from_json(r#"{"type":"fragment","text":"what is"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Fragment {
                text: "what is".to_string(),
                is_final: false
            }
        );
    }

    #[test]
    fn test_bridge_messages_parse() {
        let cmd = Command::from_json(r#"{"type":"engine_error","code":"no-speech"}"#).unwrap();
        assert_eq!(
            cmd,
            Command::EngineError {
                code: "no-speech".to_string()
            }
        );
        let cmd = Command::from_json(r#"{"type":"audio","enabled":false}"#).unwrap();
        assert_eq!(cmd, Command::Audio { enabled: false });
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Command::from_json(r#"{"type":"toggle"}"#).is_err());
        assert!(Command::from_json("not json").is_err());
    }

    #[test]
    fn test_status_response_is_flat() {
        let response = Response::Status(Snapshot {
            mode: Mode::Live,
            turn: TurnState::Speaking,
            listening: false,
            audio_enabled: true,
            question: Some("Why us?".to_string()),
            answer: None,
        });
        let json = response.to_json().unwrap();
        assert!(json.starts_with(r#"{"type":"status","mode":"live","turn":"speaking""#));
        assert_eq!(Response::from_json(&json).unwrap(), response);
    }

    #[test]
    fn test_error_response() {
        let json = Response::error("Not listening").to_json().unwrap();
        assert_eq!(json, r#"{"type":"error","message":"Not listening"}"#);
    }
}
