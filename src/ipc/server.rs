//! Async Unix socket IPC server for the daemon.

use crate::error::{IntervoiceError, Result};
use crate::ipc::protocol::{Command, Response};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Handler trait for processing IPC commands.
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync {
    /// Handle a command and return a response.
    async fn handle(&self, command: Command) -> Response;
}

/// IPC server for daemon commands via Unix socket.
///
/// A connection may carry any number of commands, one JSON object per
/// line; each gets exactly one response line.
pub struct IpcServer {
    socket_path: PathBuf,
    shutdown: watch::Sender<bool>,
}

impl IpcServer {
    pub fn new(socket_path: PathBuf) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            socket_path,
            shutdown,
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// `$XDG_RUNTIME_DIR/intervoice.sock`, or a per-user file in /tmp.
    pub fn default_socket_path() -> PathBuf {
        match std::env::var("XDG_RUNTIME_DIR") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir).join("intervoice.sock"),
            _ => {
                let uid = crate::sys::current_uid();
                PathBuf::from(format!("/tmp/intervoice-{}.sock", uid))
            }
        }
    }

    /// Accept connections until [`IpcServer::stop`] is called.
    pub async fn start<H>(&self, handler: H) -> Result<()>
    where
        H: CommandHandler + 'static,
    {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| IntervoiceError::IpcSocket {
                message: format!("Failed to remove existing socket: {}", e),
            })?;
        }

        let listener =
            UnixListener::bind(&self.socket_path).map_err(|e| IntervoiceError::IpcSocket {
                message: format!("Failed to bind to socket: {}", e),
            })?;
        debug!("IPC listening at {}", self.socket_path.display());

        let handler = Arc::new(handler);
        let mut shutdown = self.shutdown.subscribe();

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            if let Err(e) = handle_client(stream, handler).await {
                                warn!("Error handling IPC client: {}", e);
                            }
                        });
                    }
                    Err(e) => {
                        return Err(IntervoiceError::IpcConnection {
                            message: format!("Failed to accept connection: {}", e),
                        });
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Stop accepting connections and remove the socket file.
    pub fn stop(&self) -> Result<()> {
        self.shutdown.send_replace(true);

        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|e| IntervoiceError::IpcSocket {
                message: format!("Failed to remove socket file: {}", e),
            })?;
        }

        Ok(())
    }
}

/// Serve one client until it closes the connection.
async fn handle_client<H>(stream: UnixStream, handler: Arc<H>) -> Result<()>
where
    H: CommandHandler,
{
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| IntervoiceError::IpcConnection {
            message: format!("Failed to read from client: {}", e),
        })?
    {
        if line.trim().is_empty() {
            continue;
        }

        // A bad line gets an error reply; the connection stays usable.
        let response = match Command::from_json(line.trim()) {
            Ok(command) => handler.handle(command).await,
            Err(e) => Response::error(format!("Failed to parse command: {}", e)),
        };

        let mut json = response.to_json().map_err(|e| IntervoiceError::IpcProtocol {
            message: format!("Failed to serialize response: {}", e),
        })?;
        json.push('\n');

        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| IntervoiceError::IpcConnection {
                message: format!("Failed to write to client: {}", e),
            })?;
        writer
            .flush()
            .await
            .map_err(|e| IntervoiceError::IpcConnection {
                message: format!("Failed to flush writer: {}", e),
            })?;
    }

    Ok(())
}
