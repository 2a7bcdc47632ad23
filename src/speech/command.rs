//! Speech synthesis through a system TTS program.

use super::{SynthesisError, Synthesizer, VoiceParams};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::{Mutex, Notify};

/// Supported TTS programs, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProgram {
    /// speech-dispatcher client.
    SpdSay,
    EspeakNg,
    /// macOS.
    Say,
}

impl TtsProgram {
    const DETECTION_ORDER: [TtsProgram; 3] =
        [TtsProgram::SpdSay, TtsProgram::EspeakNg, TtsProgram::Say];

    pub fn from_name(name: &str) -> Option<Self> {
        let base = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name);
        match base {
            "spd-say" => Some(Self::SpdSay),
            "espeak-ng" | "espeak" => Some(Self::EspeakNg),
            "say" => Some(Self::Say),
            _ => None,
        }
    }

    pub fn binary(self) -> &'static str {
        match self {
            Self::SpdSay => "spd-say",
            Self::EspeakNg => "espeak-ng",
            Self::Say => "say",
        }
    }

    /// Command-line arguments speaking `text` with `voice`.
    pub fn args(self, text: &str, voice: &VoiceParams) -> Vec<String> {
        match self {
            // -w waits for playback; ranges are -100..=100 around 0.
            Self::SpdSay => vec![
                "-w".to_string(),
                "-r".to_string(),
                scaled(voice.rate - 1.0, 100.0, -100.0, 100.0),
                "-p".to_string(),
                scaled(voice.pitch - 1.0, 100.0, -100.0, 100.0),
                "-i".to_string(),
                scaled(voice.volume * 2.0 - 1.0, 100.0, -100.0, 100.0),
                "--".to_string(),
                text.to_string(),
            ],
            // words per minute, pitch 0..=99, amplitude 0..=200
            Self::EspeakNg => vec![
                "-s".to_string(),
                scaled(voice.rate, 175.0, 80.0, 450.0),
                "-p".to_string(),
                scaled(voice.pitch, 50.0, 0.0, 99.0),
                "-a".to_string(),
                scaled(voice.volume, 200.0, 0.0, 200.0),
                "--".to_string(),
                text.to_string(),
            ],
            Self::Say => vec![
                "-r".to_string(),
                scaled(voice.rate, 175.0, 80.0, 450.0),
                "--".to_string(),
                text.to_string(),
            ],
        }
    }

    /// First supported program found on `PATH`.
    pub fn detect() -> Option<Self> {
        Self::DETECTION_ORDER
            .into_iter()
            .find(|program| find_in_path(program.binary()))
    }
}

fn scaled(value: f32, factor: f32, min: f32, max: f32) -> String {
    let scaled = (value * factor).round().clamp(min, max);
    format!("{}", scaled as i32)
}

fn find_in_path(binary: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}

/// Runs a TTS program per utterance. Utterances never overlap: a second
/// `speak` waits for the first to finish.
pub struct CommandSynthesizer {
    program: Option<TtsProgram>,
    playback: Mutex<()>,
    cancelled: Notify,
}

impl CommandSynthesizer {
    pub fn new(program: Option<TtsProgram>) -> Self {
        Self {
            program,
            playback: Mutex::new(()),
            cancelled: Notify::new(),
        }
    }

    /// Use the configured program, or the first one found on `PATH`.
    pub fn from_command(command: Option<&str>) -> Result<Self, SynthesisError> {
        let program = match command {
            Some(name) => Some(TtsProgram::from_name(name).ok_or_else(|| {
                SynthesisError::Unavailable {
                    message: format!("unsupported speech program '{name}'"),
                }
            })?),
            None => TtsProgram::detect(),
        };
        if program.is_none() {
            tracing::warn!(
                "No speech program found (spd-say, espeak-ng, say); answers will not be spoken"
            );
        }
        Ok(Self::new(program))
    }

    pub fn program(&self) -> Option<TtsProgram> {
        self.program
    }
}

#[async_trait]
impl Synthesizer for CommandSynthesizer {
    async fn speak(&self, text: &str, voice: &VoiceParams) -> Result<(), SynthesisError> {
        let program = self.program.ok_or_else(|| SynthesisError::Unavailable {
            message: "install spd-say, espeak-ng or say".to_string(),
        })?;

        let cancelled = self.cancelled.notified();
        let _playing = self.playback.lock().await;

        let mut child = Command::new(program.binary())
            .args(program.args(text, voice))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::Failed {
                message: format!("failed to start {}: {e}", program.binary()),
            })?;

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) if status.code().is_none() => Err(SynthesisError::Interrupted),
                Ok(status) => Err(SynthesisError::Failed {
                    message: format!("{} exited with {status}", program.binary()),
                }),
                Err(e) => Err(SynthesisError::Failed {
                    message: format!("waiting for {} failed: {e}", program.binary()),
                }),
            },
            _ = cancelled => {
                if let Err(e) = child.kill().await {
                    tracing::debug!("Failed to stop {}: {}", program.binary(), e);
                }
                Err(SynthesisError::Interrupted)
            }
        }
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }

    fn name(&self) -> &str {
        self.program.map(TtsProgram::binary).unwrap_or("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_accepts_paths() {
        assert_eq!(TtsProgram::from_name("spd-say"), Some(TtsProgram::SpdSay));
        assert_eq!(
            TtsProgram::from_name("/usr/bin/espeak-ng"),
            Some(TtsProgram::EspeakNg)
        );
        assert_eq!(TtsProgram::from_name("festival"), None);
    }

    #[test]
    fn spd_say_args_map_voice() {
        let args = TtsProgram::SpdSay.args("Hello", &VoiceParams::default());
        assert_eq!(
            args,
            vec!["-w", "-r", "-10", "-p", "0", "-i", "60", "--", "Hello"]
        );
    }

    #[test]
    fn espeak_args_map_voice() {
        let args = TtsProgram::EspeakNg.args("Hi", &VoiceParams::READY);
        assert_eq!(args, vec!["-s", "210", "-p", "50", "-a", "80", "--", "Hi"]);
    }

    #[test]
    fn args_are_clamped() {
        let loud = VoiceParams {
            rate: 10.0,
            pitch: 5.0,
            volume: 1.0,
        };
        let args = TtsProgram::SpdSay.args("x", &loud);
        assert_eq!(&args[1..7], &["-r", "100", "-p", "100", "-i", "100"]);
    }

    #[test]
    fn unknown_command_is_unavailable() {
        assert!(matches!(
            CommandSynthesizer::from_command(Some("festival")),
            Err(SynthesisError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn speak_without_program_is_unavailable() {
        let synth = CommandSynthesizer::new(None);
        assert_eq!(synth.name(), "none");
        assert!(matches!(
            synth.speak("hello", &VoiceParams::default()).await,
            Err(SynthesisError::Unavailable { .. })
        ));
    }
}
