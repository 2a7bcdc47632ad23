//! IPC client for sending commands to the daemon.

use crate::error::{IntervoiceError, Result};
use crate::ipc::protocol::{Command, Response};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Send one command to the daemon and wait for its response.
///
/// # Errors
/// Returns `IntervoiceError::IpcConnection` if the daemon is unreachable and
/// `IntervoiceError::IpcProtocol` if a message cannot be encoded or decoded.
pub async fn send_command(socket_path: &Path, command: Command) -> Result<Response> {
    let stream =
        UnixStream::connect(socket_path)
            .await
            .map_err(|e| IntervoiceError::IpcConnection {
                message: format!(
                    "Failed to connect to daemon at {}: {}",
                    socket_path.display(),
                    e
                ),
            })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let mut command_json = command.to_json().map_err(|e| IntervoiceError::IpcProtocol {
        message: format!("Failed to serialize command: {}", e),
    })?;
    command_json.push('\n');

    writer
        .write_all(command_json.as_bytes())
        .await
        .map_err(|e| IntervoiceError::IpcConnection {
            message: format!("Failed to write command: {}", e),
        })?;
    writer
        .flush()
        .await
        .map_err(|e| IntervoiceError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    let mut response_line = String::new();
    let read = reader
        .read_line(&mut response_line)
        .await
        .map_err(|e| IntervoiceError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;
    if read == 0 {
        return Err(IntervoiceError::IpcConnection {
            message: "Daemon closed the connection without responding".to_string(),
        });
    }

    Response::from_json(response_line.trim()).map_err(|e| IntervoiceError::IpcProtocol {
        message: format!("Failed to deserialize response: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::server::{CommandHandler, IpcServer};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct MockHandler;

    #[async_trait::async_trait]
    impl CommandHandler for MockHandler {
        async fn handle(&self, command: Command) -> Response {
            match command {
                Command::Ask { question } if question.is_empty() => {
                    Response::error("Question is empty")
                }
                _ => Response::Ok,
            }
        }
    }

    #[tokio::test]
    async fn test_send_command_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("test.sock");

        let server = Arc::new(IpcServer::new(socket_path.clone()));
        let running = Arc::clone(&server);
        let task = tokio::spawn(async move { running.start(MockHandler).await });
        while !socket_path.exists() {
            tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        }

        let response = send_command(&socket_path, Command::Live).await.unwrap();
        assert_eq!(response, Response::Ok);

        let response = send_command(
            &socket_path,
            Command::Ask {
                question: String::new(),
            },
        )
        .await
        .unwrap();
        assert_eq!(response, Response::error("Question is empty"));

        server.stop().unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_send_command_without_daemon() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir.path().join("missing.sock");

        let result = send_command(&socket_path, Command::Status).await;
        match result {
            Err(IntervoiceError::IpcConnection { message }) => {
                assert!(message.contains("Failed to connect"));
            }
            other => panic!("Expected IpcConnection error, got {:?}", other),
        }
    }
}
