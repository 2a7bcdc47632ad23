use crate::defaults;
use thiserror::Error;

/// Answer delivery failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The answer service could not be reached or refused the request.
    #[error("dispatch failed: {message}")]
    DispatchFailure { message: String },

    /// The service replied, but not with a usable answer.
    #[error("malformed answer: {message}")]
    MalformedAnswer { message: String },
}

impl DeliveryError {
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::DispatchFailure {
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedAnswer {
            message: message.into(),
        }
    }

    /// Text shown in place of the answer.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DispatchFailure { .. } => defaults::CONNECTION_FAILED_MESSAGE,
            Self::MalformedAnswer { .. } => defaults::GENERIC_FAILURE_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages() {
        assert_eq!(
            DeliveryError::dispatch("refused").user_message(),
            "Connection failed. Please ensure the server is running."
        );
        assert_eq!(
            DeliveryError::malformed("no answer field").user_message(),
            "Error occurred. Please retry."
        );
    }

    #[test]
    fn display_includes_detail() {
        assert_eq!(
            DeliveryError::dispatch("timed out").to_string(),
            "dispatch failed: timed out"
        );
    }
}
