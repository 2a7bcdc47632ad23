//! One-shot HTTP answer service: `POST {base}/ask`.

use super::error::DeliveryError;
use super::service::{AnswerService, AskRequest, AskResponse};
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub struct HttpAnswerService {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpAnswerService {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::dispatch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Parse an `{answer}` body. A missing or blank answer is malformed.
pub fn parse_answer(body: &str) -> Result<String, DeliveryError> {
    let response: AskResponse = serde_json::from_str(body)
        .map_err(|e| DeliveryError::malformed(format!("unexpected response body: {e}")))?;
    if response.answer.trim().is_empty() {
        return Err(DeliveryError::malformed("the answer was empty"));
    }
    Ok(response.answer)
}

#[async_trait]
impl AnswerService for HttpAnswerService {
    async fn ask(&self, question: &str) -> Result<String, DeliveryError> {
        let body = serde_json::to_vec(&AskRequest {
            question: question.to_string(),
        })
        .map_err(|e| DeliveryError::dispatch(format!("failed to encode question: {e}")))?;

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                DeliveryError::dispatch(format!("request to {} failed: {e}", self.endpoint))
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DeliveryError::dispatch(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(DeliveryError::dispatch(format!(
                "answer service returned status {status}"
            )));
        }

        parse_answer(&text)
    }

    fn name(&self) -> &str {
        "http"
    }
}
