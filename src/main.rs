use anyhow::Result;
use clap::{CommandFactory, Parser};
use intervoice::app::{run_ask, run_interactive};
use intervoice::cli::{Cli, Commands, ConfigAction, HistoryAction};
use intervoice::config::Config;
use intervoice::daemon::run_daemon;
use intervoice::history::{HistoryStore, open_history};
use intervoice::ipc::client::send_command;
use intervoice::ipc::protocol::{Command, Response};
use intervoice::ipc::server::IpcServer;
use intervoice::speech::AudioToggle;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    intervoice::logging::init(cli.verbose, cli.quiet);

    match cli.command {
        None => {
            let config = load_config(&cli)?;
            let audio = audio_toggle(&cli, &config);
            run_interactive(config, audio, cli.quiet).await?;
        }
        Some(Commands::Ask {
            ref question,
            plain,
        }) => {
            let config = load_config(&cli)?;
            let audio = audio_toggle(&cli, &config);
            run_ask(config, audio, &question.join(" "), plain).await?;
        }
        Some(Commands::Daemon { ref socket }) => {
            let config = load_config(&cli)?;
            let audio = audio_toggle(&cli, &config);
            run_daemon(config, audio, socket.clone(), cli.quiet).await?;
        }
        Some(Commands::Live { socket }) => handle_ipc_command(socket, Command::Live).await?,
        Some(Commands::EndLive { socket }) => handle_ipc_command(socket, Command::EndLive).await?,
        Some(Commands::Start { socket }) => handle_ipc_command(socket, Command::Start).await?,
        Some(Commands::Stop { socket }) => handle_ipc_command(socket, Command::Stop).await?,
        Some(Commands::Send { socket }) => handle_ipc_command(socket, Command::Send).await?,
        Some(Commands::Status { socket }) => handle_ipc_command(socket, Command::Status).await?,
        Some(Commands::Shutdown { socket }) => {
            handle_ipc_command(socket, Command::Shutdown).await?
        }
        Some(Commands::Audio { state, socket }) => {
            handle_ipc_command(
                socket,
                Command::Audio {
                    enabled: state.enabled(),
                },
            )
            .await?
        }
        Some(Commands::Say {
            text,
            interim,
            socket,
        }) => {
            handle_ipc_command(
                socket,
                Command::Fragment {
                    text: text.join(" "),
                    is_final: !interim,
                },
            )
            .await?
        }
        Some(Commands::History { ref action }) => {
            let config = load_config(&cli)?;
            handle_history_command(action.as_ref(), &config)?;
        }
        Some(Commands::Config { ref action }) => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "intervoice",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn config_path(custom_path: Option<&Path>) -> Result<PathBuf> {
    match custom_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::default_path()?),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.as_deref() {
        // An explicit path must exist
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path()?)?,
    }
    .with_env_overrides();

    if let Some(url) = &cli.url {
        config.service.url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn audio_toggle(cli: &Cli, config: &Config) -> AudioToggle {
    AudioToggle::new(config.speech.enabled && !cli.no_audio)
}

fn handle_history_command(action: Option<&HistoryAction>, config: &Config) -> Result<()> {
    let history = open_history(&config.history)?;
    match action.unwrap_or(&HistoryAction::List { limit: None }) {
        HistoryAction::List { limit } => {
            let entries = history.list()?;
            if entries.is_empty() {
                println!("{}", "No questions yet.".dimmed());
            }
            for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{} {}", format!("[{}]", entry.id).dimmed(), entry.question.bold());
                for line in intervoice::delivery::format_answer(&entry.answer).lines() {
                    println!("    {}", line);
                }
            }
        }
        HistoryAction::Delete { id } => {
            if history.delete(*id)? {
                println!("{}", format!("Deleted {}", id).green());
            } else {
                eprintln!("{}", format!("No entry {}", id).red());
                std::process::exit(1);
            }
        }
        HistoryAction::Clear => {
            history.clear()?;
            println!("{}", "History cleared".green());
        }
    }
    Ok(())
}

fn handle_config_command(action: &ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let path = config_path(custom_path)?;
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let config = Config::load_or_default(&path)?.with_env_overrides();
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Check => {
            let config = Config::load_or_default(&path)?;
            match config.validate() {
                Ok(()) => println!("{} {}", "✓".green(), path.display()),
                Err(e) => {
                    eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}

async fn handle_ipc_command(socket: Option<PathBuf>, command: Command) -> Result<()> {
    let socket_path = socket.unwrap_or_else(IpcServer::default_socket_path);

    match send_command(&socket_path, command).await {
        Ok(Response::Ok) => {}
        Ok(Response::Status(status)) => {
            println!("Status:");
            println!("  {}     {}", "Version:".dimmed(), intervoice::version_string());
            println!("  {}        {}", "Mode:".dimmed(), status.mode);
            println!("  {}        {}", "Turn:".dimmed(), status.turn);
            println!(
                "  {}   {}",
                "Listening:".dimmed(),
                if status.listening { "yes" } else { "no" }
            );
            println!(
                "  {}       {}",
                "Audio:".dimmed(),
                if status.audio_enabled { "on" } else { "off" }
            );
            if let Some(question) = status.question {
                println!("  {}    {}", "Question:".dimmed(), question);
            }
            if let Some(answer) = status.answer {
                println!("  {}", "Answer:".dimmed());
                for line in answer.lines() {
                    println!("    {}", line);
                }
            }
        }
        Ok(Response::Error { message }) => {
            eprintln!("{}", format!("Error: {}", message).red());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!(
                "{}",
                format!("Failed to communicate with daemon: {}", e).red()
            );
            eprintln!("Is the daemon running? Start it with: intervoice daemon");
            std::process::exit(1);
        }
    }

    Ok(())
}
