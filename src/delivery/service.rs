//! Answer service abstraction and its wire types.

use super::error::DeliveryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::Mutex;

/// Body of a one-shot question request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Body of a one-shot answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

/// Messages on the persistent duplex channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    Question { question: String },
    Answer { answer: String },
    /// Status, progress and heartbeat frames. Never sent.
    #[serde(other, skip_serializing)]
    Other,
}

/// Something that answers questions.
///
/// Exactly one answer (or error) comes back for each question sent.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, DeliveryError>;

    /// Service name for logging.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: AnswerService + ?Sized> AnswerService for Arc<T> {
    async fn ask(&self, question: &str) -> Result<String, DeliveryError> {
        (**self).ask(question).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Mock answer service for testing
#[derive(Debug, Default)]
pub struct MockAnswerService {
    answer: String,
    failure: Option<DeliveryError>,
    asked: Mutex<Vec<String>>,
}

impl MockAnswerService {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            failure: None,
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Configure the mock to fail every request
    pub fn with_failure(mut self, error: DeliveryError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Questions received so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .map(|asked| asked.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AnswerService for MockAnswerService {
    async fn ask(&self, question: &str) -> Result<String, DeliveryError> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.answer.clone()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
