//! Command-line interface for intervoice
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Voice interview assistant
#[derive(Parser, Debug)]
#[command(
    name = "intervoice",
    version,
    about = "Voice interview assistant: hears a question, fetches an answer, types and speaks it"
)]
pub struct Cli {
    /// Subcommand to execute (default: interactive session)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Answer service base URL (overrides config and INTERVOICE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Do not speak answers
    #[arg(long, global = true)]
    pub no_audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn enabled(self) -> bool {
        self == Switch::On
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask one question and print the answer
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
        /// Print the answer at once, without the typewriter reveal
        #[arg(long)]
        plain: bool,
    },

    /// Run a session behind the IPC socket (foreground)
    Daemon {
        /// Path to Unix socket (default: $XDG_RUNTIME_DIR/intervoice.sock)
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Enter live mode via IPC
    Live {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Leave live mode via IPC
    EndLive {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Start push-to-talk capture via IPC
    Start {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Stop push-to-talk capture and send what was heard, via IPC
    Stop {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Send the detected question now, via IPC
    Send {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Show daemon status
    Status {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Shut down the daemon
    Shutdown {
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Turn spoken answers on or off in the daemon
    Audio {
        state: Switch,
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Post a transcript fragment to the daemon, as a recognizer would
    Say {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        /// Post as an interim fragment
        #[arg(long)]
        interim: bool,
        #[arg(long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },

    /// Browse answered questions
    History {
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Question history actions
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum HistoryAction {
    /// List entries, newest first
    List {
        /// Show at most N entries
        #[arg(long, short = 'n', value_name = "N")]
        limit: Option<usize>,
    },
    /// Delete one entry
    Delete { id: u64 },
    /// Delete every entry
    Clear,
}

/// Configuration actions
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file path
    Path,
    /// Validate the configuration file
    Check,
}
