//! Terminal rendering of controller presentation updates.
//! Answers go to stdout, everything else to stderr.

use crate::controller::{Mode, Presentation};
use crate::session::Presenter;
use std::io::{self, Write};

const DIM: &str = "\x1b[2m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Clear the current terminal line (replaces the detection preview)
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

fn mode_label(mode: Mode) -> String {
    match mode {
        Mode::Live => format!("{GREEN}● live{RESET}"),
        Mode::Manual => format!("{YELLOW}● manual{RESET}"),
        Mode::Idle => format!("{DIM}○ idle{RESET}"),
    }
}

/// One stderr line for a status update; `None` for updates that are not
/// status lines (answer text, the live preview) or are hidden when quiet.
pub fn status_line(update: &Presentation, quiet: bool) -> Option<String> {
    match update {
        Presentation::ModeChanged(mode) => Some(mode_label(*mode)),
        Presentation::Listening(true) if !quiet => Some(format!("{DIM}Listening...{RESET}")),
        Presentation::Listening(false) if !quiet => Some(format!("{DIM}Not listening{RESET}")),
        Presentation::Submitting(question) => Some(format!("{BOLD}Q:{RESET} {question}")),
        Presentation::AnswerFailed(message) => Some(format!("{RED}{message}{RESET}")),
        Presentation::Ready if !quiet => Some(format!("{DIM}Ready for next question{RESET}")),
        Presentation::Notice(text) => Some(format!("{DIM}{text}{RESET}")),
        _ => None,
    }
}

/// Presenter for the interactive terminal session.
pub struct TerminalPresenter {
    quiet: bool,
    /// A detection preview is on the current stderr line.
    previewing: bool,
}

impl TerminalPresenter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            previewing: false,
        }
    }

    fn end_preview(&mut self) {
        if self.previewing {
            clear_line();
            self.previewing = false;
        }
    }
}

impl Presenter for TerminalPresenter {
    fn present(&mut self, update: &Presentation) {
        match update {
            Presentation::QuestionDetected(text) => {
                if !self.quiet {
                    eprint!("\r\x1b[2K{YELLOW}?{RESET} {DIM}{text}{RESET}");
                    io::stderr().flush().ok();
                    self.previewing = true;
                }
            }
            Presentation::AnswerStarted => self.end_preview(),
            Presentation::Reveal(c) => {
                let mut stdout = io::stdout();
                write!(stdout, "{c}").ok();
                stdout.flush().ok();
            }
            Presentation::AnswerFinished => println!(),
            other => {
                self.end_preview();
                if let Some(line) = status_line(other, self.quiet) {
                    eprintln!("{line}");
                }
            }
        }
    }
}
