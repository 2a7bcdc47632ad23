//! Persistent WebSocket channel to the answer service.
//!
//! Carries `{type:"question", question}` out and `{type:"answer", answer}`
//! back. One exchange at a time: the stream lock is held from sending the
//! question until its answer arrives.

use super::error::DeliveryError;
use super::service::ChannelMessage;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How an exchange failed, which decides whether another path may retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    /// The question never left; retrying elsewhere cannot duplicate it.
    NotSent(DeliveryError),
    /// The question was sent but no usable answer came back.
    Lost(DeliveryError),
}

impl From<ExchangeError> for DeliveryError {
    fn from(error: ExchangeError) -> Self {
        match error {
            ExchangeError::NotSent(e) | ExchangeError::Lost(e) => e,
        }
    }
}

pub struct WsAnswerChannel {
    url: Url,
    stream: Mutex<WsStream>,
    open: AtomicBool,
    timeout: Duration,
}

impl WsAnswerChannel {
    /// Open the channel, giving up after `timeout`.
    pub async fn connect(url: Url, timeout: Duration) -> Result<Self, DeliveryError> {
        let (stream, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| DeliveryError::dispatch(format!("connecting to {url} timed out")))?
            .map_err(|e| {
                DeliveryError::dispatch(format!("websocket connect to {url} failed: {e}"))
            })?;

        tracing::debug!("WebSocket channel open: {}", url);
        Ok(Self {
            url,
            stream: Mutex::new(stream),
            open: AtomicBool::new(true),
            timeout,
        })
    }

    /// How long to wait for each answer. Defaults to the connect timeout.
    pub fn with_answer_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send one question and wait for its answer.
    pub async fn exchange(&self, question: &str) -> Result<String, ExchangeError> {
        if !self.is_open() {
            return Err(ExchangeError::NotSent(DeliveryError::dispatch(
                "websocket channel is closed",
            )));
        }

        let payload = serde_json::to_string(&ChannelMessage::Question {
            question: question.to_string(),
        })
        .map_err(|e| {
            ExchangeError::NotSent(DeliveryError::dispatch(format!(
                "failed to encode question: {e}"
            )))
        })?;

        let mut stream = self.stream.lock().await;
        if let Err(e) = stream.send(Message::text(payload)).await {
            self.mark_closed();
            return Err(ExchangeError::NotSent(DeliveryError::dispatch(format!(
                "websocket send failed: {e}"
            ))));
        }

        loop {
            let next = match tokio::time::timeout(self.timeout, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    // A late answer would be read as the next question's.
                    self.mark_closed();
                    return Err(lost("timed out waiting for an answer"));
                }
            };

            match next {
                None | Some(Ok(Message::Close(_))) => {
                    self.mark_closed();
                    return Err(lost("websocket closed before the answer arrived"));
                }
                Some(Err(e)) => {
                    self.mark_closed();
                    return Err(lost(&format!("websocket receive failed: {e}")));
                }
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ChannelMessage>(text.as_str()) {
                        Ok(ChannelMessage::Answer { answer }) if !answer.trim().is_empty() => {
                            return Ok(answer);
                        }
                        Ok(ChannelMessage::Answer { .. }) => {
                            return Err(ExchangeError::Lost(DeliveryError::malformed(
                                "the answer was empty",
                            )));
                        }
                        Ok(ChannelMessage::Question { .. } | ChannelMessage::Other) => {
                            tracing::debug!("Skipping non-answer frame: {}", text.as_str());
                            continue;
                        }
                        Err(e) => {
                            // The real answer may still be in flight.
                            self.mark_closed();
                            return Err(ExchangeError::Lost(DeliveryError::malformed(format!(
                                "unexpected channel message: {e}"
                            ))));
                        }
                    }
                }
                // Ping/pong and binary frames carry no answers.
                Some(Ok(_)) => continue,
            }
        }
    }

    /// Close the channel politely.
    pub async fn close(&self) {
        self.mark_closed();
        let mut stream = self.stream.lock().await;
        if let Err(e) = stream.close(None).await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }

    fn mark_closed(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            tracing::warn!("WebSocket channel to {} closed, using HTTP", self.url);
        }
    }
}

fn lost(message: &str) -> ExchangeError {
    ExchangeError::Lost(DeliveryError::dispatch(message))
}
