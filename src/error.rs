//! Error types for intervoice.

use crate::delivery::DeliveryError;
use crate::recognition::RecognitionError;
use crate::speech::SynthesisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntervoiceError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Could not determine {kind} directory")]
    NoHomeDirectory { kind: &'static str },

    // Voice pipeline errors
    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Answer delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Speech synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    // Question history errors
    #[error("History store error: {message}")]
    History { message: String },

    // IPC errors
    #[error("IPC socket error: {message}")]
    IpcSocket { message: String },

    #[error("IPC protocol error: {message}")]
    IpcProtocol { message: String },

    #[error("IPC connection failed: {message}")]
    IpcConnection { message: String },

    // Session errors
    #[error("Session is no longer running")]
    SessionClosed,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, IntervoiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = IntervoiceError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = IntervoiceError::ConfigInvalidValue {
            key: "detection.duplicate_ratio".to_string(),
            message: "must be in (0, 1]".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for detection.duplicate_ratio: must be in (0, 1]"
        );
    }

    #[test]
    fn test_recognition_error_converts() {
        let error: IntervoiceError = RecognitionError::PermissionDenied.into();
        assert_eq!(
            error.to_string(),
            "Recognition error: microphone access was denied"
        );
    }

    #[test]
    fn test_delivery_error_converts() {
        let error: IntervoiceError = DeliveryError::DispatchFailure {
            message: "connection refused".to_string(),
        }
        .into();
        assert!(error.to_string().contains("connection refused"));
    }

    #[test]
    fn test_synthesis_error_converts() {
        let error: IntervoiceError = SynthesisError::Interrupted.into();
        assert!(error.to_string().starts_with("Speech synthesis error"));
    }

    #[test]
    fn test_ipc_errors_display() {
        let error = IntervoiceError::IpcSocket {
            message: "bind failed".to_string(),
        };
        assert_eq!(error.to_string(), "IPC socket error: bind failed");

        let error = IntervoiceError::IpcProtocol {
            message: "invalid message format".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "IPC protocol error: invalid message format"
        );

        let error = IntervoiceError::IpcConnection {
            message: "timeout".to_string(),
        };
        assert_eq!(error.to_string(), "IPC connection failed: timeout");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: IntervoiceError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: IntervoiceError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: IntervoiceError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<IntervoiceError>();
        assert_sync::<IntervoiceError>();
    }
}
