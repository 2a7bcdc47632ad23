//! Daemon mode: a session behind the IPC socket.
//!
//! External recognizers (a browser bridge, a separate speech-to-text
//! process) stream fragments over the socket; the CLI sends mode changes
//! and status queries.

pub mod handler;

use crate::app::connect_services;
use crate::config::Config;
use crate::delivery::AnswerService;
use crate::error::{IntervoiceError, Result};
use crate::ipc::server::IpcServer;
use crate::output::TerminalPresenter;
use crate::recognition::feed_engine;
use crate::session::{NullPresenter, Presenter, Session, SessionParts};
use crate::speech::AudioToggle;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Run the daemon until SIGINT, SIGTERM or a `shutdown` command.
pub async fn run_daemon(
    config: Config,
    audio: AudioToggle,
    socket_path: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let services = connect_services(&config).await?;
    let (events_tx, events) = mpsc::unbounded_channel();
    let (engine, feed) = feed_engine("ipc", events_tx);

    let presenter: Box<dyn Presenter> = if quiet {
        Box::new(NullPresenter)
    } else {
        Box::new(TerminalPresenter::new(false))
    };
    let parts = SessionParts {
        engine: Box::new(engine),
        events,
        answers: Arc::clone(&services.answers) as Arc<dyn AnswerService>,
        synthesizer: services.synthesizer,
        history: services.history,
        presenter,
    };
    let (session, handle) = Session::new(&config, audio, parts);
    let mut session_task = tokio::spawn(session.run());

    let socket_path = socket_path.unwrap_or_else(IpcServer::default_socket_path);
    let server = Arc::new(IpcServer::new(socket_path));
    if !quiet {
        eprintln!("IPC server listening at: {}", server.socket_path().display());
    }

    let handler = handler::DaemonCommandHandler::new(handle.clone(), feed);
    let running = Arc::clone(&server);
    let server_task = tokio::spawn(async move { running.start(handler).await });

    let session_result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down");
            None
        }
        res = wait_for_sigterm() => {
            if let Err(e) = res {
                warn!("Error setting up signal handler: {}", e);
            }
            info!("Received SIGTERM, shutting down");
            None
        }
        finished = &mut session_task => Some(finished),
    };

    server.stop()?;
    if let Err(e) = server_task.await {
        warn!("Daemon server task failed: {}", e);
    }

    let finished = match session_result {
        Some(finished) => finished,
        None => {
            if handle.shutdown().is_err() {
                warn!("Session already stopped");
            }
            session_task.await
        }
    };
    services.answers.close().await;

    if !quiet {
        eprintln!("Daemon stopped.");
    }
    finished.map_err(|e| IntervoiceError::Other(format!("session task failed: {e}")))?
}

/// Wait for SIGTERM signal (used by systemd).
#[cfg(unix)]
async fn wait_for_sigterm() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| IntervoiceError::Other(format!("Failed to register SIGTERM handler: {}", e)))?;
    sigterm.recv().await;
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_sigterm() -> Result<()> {
    std::future::pending::<()>().await;
    Ok(())
}
