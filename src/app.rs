//! Interview assistant entry points.
//!
//! Wires the answer service, speech synthesizer and history store into a
//! [`Session`] for the interactive terminal, and runs one-shot questions.

use crate::config::{Config, parse_switch};
use crate::controller::UserAction;
use crate::delivery::{AnswerDispatcher, AnswerService, Typewriter, format_answer, speech_text};
use crate::error::Result;
use crate::history::{HistoryStore, open_history};
use crate::output::TerminalPresenter;
use crate::recognition::feed_engine;
use crate::session::{Session, SessionHandle, SessionParts};
use crate::speech::{AudioToggle, CommandSynthesizer, Synthesizer, VoiceParams};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Shared collaborators of a session.
pub struct Services {
    pub answers: Arc<AnswerDispatcher>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub history: Arc<dyn HistoryStore>,
}

/// Build the answer dispatcher (opening the persistent channel when
/// enabled), the synthesizer and the history store.
pub async fn connect_services(config: &Config) -> Result<Services> {
    let answers = Arc::new(AnswerDispatcher::new(&config.service)?);
    if config.service.websocket && !answers.connect().await {
        info!("Answer channel not available yet, questions go over HTTP");
    }
    let synthesizer = Arc::new(CommandSynthesizer::from_command(
        config.speech.command.as_deref(),
    )?);
    let history = open_history(&config.history)?;
    Ok(Services {
        answers,
        synthesizer,
        history,
    })
}

/// What a line typed into the interactive session asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    User(UserAction),
    /// Transcript text for the terminal recognizer.
    Fragment { text: String, is_final: bool },
    Audio(bool),
    Status,
    Help,
    Quit,
    Invalid(String),
    Nothing,
}

pub const HELP: &str = "\
Commands:
  /live            continuous listening
  /end             end live mode
  /start, /stop    push-to-talk capture
  /send            send the detected question now
  /ask <question>  type a question
  /audio on|off    speak answers or not
  /status          show the current state
  /quit            leave
While listening, a line is heard as speech (prefix ~ for an interim
fragment). Otherwise a line is sent as a typed question.";

/// Interpret one terminal line. `listening` tells whether capture is on.
pub fn parse_line(line: &str, listening: bool) -> LineAction {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Nothing;
    }

    if let Some(command) = line.strip_prefix('/') {
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(name, rest)| (name, rest.trim()))
            .unwrap_or((command, ""));
        return match name {
            "live" => LineAction::User(UserAction::GoLive),
            "end" | "end-live" => LineAction::User(UserAction::EndLive),
            "start" => LineAction::User(UserAction::StartListening),
            "stop" => LineAction::User(UserAction::StopListening),
            "send" => LineAction::User(UserAction::Submit),
            "ask" if rest.is_empty() => LineAction::Invalid("Usage: /ask <question>".to_string()),
            "ask" => LineAction::User(UserAction::Ask(rest.to_string())),
            "audio" => match parse_switch(rest) {
                Some(enabled) => LineAction::Audio(enabled),
                None => LineAction::Invalid("Usage: /audio on|off".to_string()),
            },
            "status" => LineAction::Status,
            "help" | "?" => LineAction::Help,
            "quit" | "exit" | "q" => LineAction::Quit,
            other => LineAction::Invalid(format!("Unknown command /{other}, try /help")),
        };
    }

    if let Some(interim) = line.strip_prefix('~') {
        return LineAction::Fragment {
            text: interim.trim().to_string(),
            is_final: false,
        };
    }

    if listening {
        LineAction::Fragment {
            text: line.to_string(),
            is_final: true,
        }
    } else {
        LineAction::User(UserAction::Ask(line.to_string()))
    }
}

/// Interactive terminal session: stdin lines stand in for the recognizer.
pub async fn run_interactive(config: Config, audio: AudioToggle, quiet: bool) -> Result<()> {
    let services = connect_services(&config).await?;
    let (events_tx, events) = mpsc::unbounded_channel();
    let (engine, feed) = feed_engine("terminal", events_tx);

    let parts = SessionParts {
        engine: Box::new(engine),
        events,
        answers: Arc::clone(&services.answers) as Arc<dyn AnswerService>,
        synthesizer: services.synthesizer,
        history: services.history,
        presenter: Box::new(TerminalPresenter::new(quiet)),
    };
    let (session, handle) = Session::new(&config, audio, parts);
    let session_task = tokio::spawn(session.run());

    if !quiet {
        eprintln!("intervoice {}: /live to start, /help for commands", crate::version_string());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(&line, feed.is_listening()) {
            LineAction::User(action) => handle.send(action)?,
            LineAction::Fragment { text, is_final } => {
                if !feed.post(&text, is_final) {
                    eprintln!("Not listening. /start or /live first.");
                }
            }
            LineAction::Audio(enabled) => handle.set_audio(enabled)?,
            LineAction::Status => print_status(&handle).await?,
            LineAction::Help => eprintln!("{HELP}"),
            LineAction::Invalid(message) => eprintln!("{message}"),
            LineAction::Quit => break,
            LineAction::Nothing => {}
        }
    }

    handle.shutdown()?;
    match session_task.await {
        Ok(result) => result?,
        Err(e) => warn!("Session task failed: {}", e),
    }
    services.answers.close().await;
    Ok(())
}

async fn print_status(handle: &SessionHandle) -> Result<()> {
    let status = handle.status().await?;
    eprintln!(
        "mode: {}  turn: {}  listening: {}  audio: {}",
        status.mode,
        status.turn,
        if status.listening { "yes" } else { "no" },
        if status.audio_enabled { "on" } else { "off" },
    );
    if let Some(question) = status.question {
        eprintln!("question: {question}");
    }
    Ok(())
}

/// Ask one question and print (and optionally speak) the answer.
pub async fn run_ask(
    config: Config,
    audio: AudioToggle,
    question: &str,
    plain: bool,
) -> Result<()> {
    let services = connect_services(&config).await?;
    let raw = services.answers.ask(question).await?;
    services.answers.close().await;

    let formatted = format_answer(&raw);
    if formatted.is_empty() {
        return Err(crate::delivery::DeliveryError::malformed("the answer was empty").into());
    }
    if let Err(e) = services.history.record(question, &raw) {
        warn!("Failed to record history: {}", e);
    }

    if plain {
        println!("{formatted}");
    } else {
        let mut typewriter = Typewriter::new(&formatted);
        let mut stdout = std::io::stdout();
        while let Some(c) = typewriter.advance() {
            write!(stdout, "{c}").ok();
            stdout.flush().ok();
            tokio::time::sleep(config.timing.typewriter()).await;
        }
        println!();
    }

    if audio.is_enabled() {
        let voice = VoiceParams::from(&config.speech);
        if let Err(e) = services
            .synthesizer
            .speak(&speech_text(&formatted), &voice)
            .await
        {
            warn!("Answer not spoken: {}", e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_map_to_actions() {
        assert_eq!(parse_line("/live", false), LineAction::User(UserAction::GoLive));
        assert_eq!(parse_line("/end", true), LineAction::User(UserAction::EndLive));
        assert_eq!(
            parse_line("/start", false),
            LineAction::User(UserAction::StartListening)
        );
        assert_eq!(parse_line("/send", true), LineAction::User(UserAction::Submit));
        assert_eq!(parse_line("/audio off", true), LineAction::Audio(false));
        assert_eq!(parse_line("  /quit ", true), LineAction::Quit);
    }

    #[test]
    fn ask_takes_the_rest_of_the_line() {
        assert_eq!(
            parse_line("/ask  why this company?", true),
            LineAction::User(UserAction::Ask("why this company?".to_string()))
        );
        assert!(matches!(parse_line("/ask", true), LineAction::Invalid(_)));
    }

    #[test]
    fn bad_commands_explain_themselves() {
        assert!(matches!(
            parse_line("/audio loud", true),
            LineAction::Invalid(m) if m.contains("on|off")
        ));
        assert!(matches!(
            parse_line("/dance", true),
            LineAction::Invalid(m) if m.contains("/dance")
        ));
    }

    #[test]
    fn plain_lines_depend_on_listening() {
        assert_eq!(
            parse_line("what is your biggest weakness", true),
            LineAction::Fragment {
                text: "what is your biggest weakness".to_string(),
                is_final: true
            }
        );
        assert_eq!(
            parse_line("what is your biggest weakness", false),
            LineAction::User(UserAction::Ask("what is your biggest weakness".to_string()))
        );
    }

    #[test]
    fn tilde_marks_interim() {
        assert_eq!(
            parse_line("~what is your", true),
            LineAction::Fragment {
                text: "what is your".to_string(),
                is_final: false
            }
        );
        assert_eq!(parse_line("   ", true), LineAction::Nothing);
    }
}
