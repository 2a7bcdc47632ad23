//! Answer dispatch: the persistent channel when it is open, a one-shot HTTP
//! request otherwise.

use super::error::DeliveryError;
use super::http::HttpAnswerService;
use super::service::AnswerService;
use super::ws::{ExchangeError, WsAnswerChannel};
use crate::config::ServiceConfig;
use crate::defaults;
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// Minimum spacing between WebSocket reconnect attempts.
const RECONNECT_INTERVAL: Duration = Duration::from_secs(30);

/// Upper bound on a connect attempt made on the way to answering.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Endpoints derived from the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub ask: Url,
    pub channel: Url,
}

impl ServiceEndpoints {
    /// Resolve `/ask` and the WebSocket `/ws` against `base`
    /// (`http` becomes `ws`, `https` becomes `wss`).
    pub fn from_base(base: &str) -> Result<Self, DeliveryError> {
        let base = Url::parse(base)
            .map_err(|e| DeliveryError::dispatch(format!("invalid service URL '{base}': {e}")))?;
        let ws_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(DeliveryError::dispatch(format!(
                    "unsupported service URL scheme '{other}'"
                )));
            }
        };

        let ask = join_path(&base, defaults::ASK_PATH);
        let mut channel = join_path(&base, defaults::WS_PATH);
        channel
            .set_scheme(ws_scheme)
            .map_err(|_| DeliveryError::dispatch("cannot derive the WebSocket URL"))?;
        Ok(Self { ask, channel })
    }
}

fn join_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    url.set_path(&format!("{prefix}{path}"));
    url.set_query(None);
    url
}

struct ChannelSlot {
    channel: Option<WsAnswerChannel>,
    last_attempt: Option<Instant>,
}

pub struct AnswerDispatcher {
    endpoints: ServiceEndpoints,
    http: HttpAnswerService,
    request_timeout: Duration,
    websocket: bool,
    slot: Mutex<ChannelSlot>,
}

impl AnswerDispatcher {
    pub fn new(config: &ServiceConfig) -> Result<Self, DeliveryError> {
        let endpoints = ServiceEndpoints::from_base(&config.url)?;
        let http = HttpAnswerService::new(endpoints.ask.clone(), config.request_timeout())?;
        Ok(Self {
            endpoints,
            http,
            request_timeout: config.request_timeout(),
            websocket: config.websocket,
            slot: Mutex::new(ChannelSlot {
                channel: None,
                last_attempt: None,
            }),
        })
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    /// Try to open the persistent channel now. Failure is not an error:
    /// questions go over HTTP until a later attempt succeeds.
    pub async fn connect(&self) -> bool {
        if !self.websocket {
            return false;
        }
        let mut slot = self.slot.lock().await;
        self.reconnect(&mut slot).await
    }

    /// Whether the persistent channel is currently open.
    pub async fn channel_open(&self) -> bool {
        let slot = self.slot.lock().await;
        slot.channel.as_ref().is_some_and(WsAnswerChannel::is_open)
    }

    async fn reconnect(&self, slot: &mut ChannelSlot) -> bool {
        slot.last_attempt = Some(Instant::now());
        match WsAnswerChannel::connect(self.endpoints.channel.clone(), CONNECT_TIMEOUT).await {
            Ok(channel) => {
                tracing::info!("Answer channel connected: {}", self.endpoints.channel);
                slot.channel = Some(channel.with_answer_timeout(self.request_timeout));
                true
            }
            Err(e) => {
                tracing::info!("Answer channel unavailable, using HTTP: {}", e);
                slot.channel = None;
                false
            }
        }
    }

    async fn ask_channel(&self, question: &str) -> Option<Result<String, DeliveryError>> {
        if !self.websocket {
            return None;
        }
        let mut slot = self.slot.lock().await;

        let open = slot.channel.as_ref().is_some_and(WsAnswerChannel::is_open);
        if !open {
            let due = slot
                .last_attempt
                .is_none_or(|at| at.elapsed() >= RECONNECT_INTERVAL);
            if !due || !self.reconnect(&mut slot).await {
                return None;
            }
        }

        let channel = slot.channel.as_ref()?;
        match channel.exchange(question).await {
            Ok(answer) => Some(Ok(answer)),
            // Never delivered: the HTTP path can take it without duplication.
            Err(ExchangeError::NotSent(e)) => {
                tracing::warn!("Answer channel send failed, falling back to HTTP: {}", e);
                None
            }
            Err(ExchangeError::Lost(e)) => Some(Err(e)),
        }
    }

    /// Close the persistent channel.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        if let Some(channel) = slot.channel.take() {
            channel.close().await;
        }
    }
}

#[async_trait]
impl AnswerService for AnswerDispatcher {
    async fn ask(&self, question: &str) -> Result<String, DeliveryError> {
        if let Some(result) = self.ask_channel(question).await {
            return result;
        }
        tracing::debug!("Asking over HTTP: {}", self.endpoints.ask);
        self.http.ask(question).await
    }

    fn name(&self) -> &str {
        "dispatcher"
    }
}
