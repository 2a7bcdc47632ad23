//! Command handler implementation for the daemon.

use crate::controller::UserAction;
use crate::ipc::protocol::{Command, Response};
use crate::ipc::server::CommandHandler;
use crate::recognition::{EngineErrorCode, EngineFeed};
use crate::session::SessionHandle;
use tracing::debug;

/// Routes IPC commands to the session and its recognizer feed.
pub struct DaemonCommandHandler {
    session: SessionHandle,
    feed: EngineFeed,
}

impl DaemonCommandHandler {
    pub fn new(session: SessionHandle, feed: EngineFeed) -> Self {
        Self { session, feed }
    }

    fn user(&self, action: UserAction) -> Response {
        match self.session.send(action) {
            Ok(()) => Response::Ok,
            Err(e) => Response::error(e.to_string()),
        }
    }

    fn fragment(&self, text: &str, is_final: bool) -> Response {
        if text.trim().is_empty() {
            return Response::error("Fragment is empty");
        }
        if self.feed.post(text, is_final) {
            Response::Ok
        } else {
            debug!("Fragment dropped, not listening: {:?}", text);
            Response::error("Not listening")
        }
    }

    async fn status(&self) -> Response {
        match self.session.status().await {
            Ok(snapshot) => Response::Status(snapshot),
            Err(e) => Response::error(e.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl CommandHandler for DaemonCommandHandler {
    async fn handle(&self, command: Command) -> Response {
        match command {
            Command::Fragment { text, is_final } => self.fragment(&text, is_final),
            Command::EngineEnded => {
                self.feed.ended();
                Response::Ok
            }
            Command::EngineError { code } => {
                self.feed.error(EngineErrorCode::parse(&code));
                Response::Ok
            }
            Command::Start => self.user(UserAction::StartListening),
            Command::Stop => self.user(UserAction::StopListening),
            Command::Live => self.user(UserAction::GoLive),
            Command::EndLive => self.user(UserAction::EndLive),
            Command::Send => self.user(UserAction::Submit),
            Command::Ask { question } => {
                if question.trim().is_empty() {
                    Response::error("Question is empty")
                } else {
                    self.user(UserAction::Ask(question))
                }
            }
            Command::Audio { enabled } => match self.session.set_audio(enabled) {
                Ok(()) => Response::Ok,
                Err(e) => Response::error(e.to_string()),
            },
            Command::Status => self.status().await,
            Command::Shutdown => match self.session.shutdown() {
                Ok(()) => Response::Ok,
                Err(e) => Response::error(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::controller::{Mode, TurnState};
    use crate::delivery::MockAnswerService;
    use crate::history::NullHistory;
    use crate::recognition::feed_engine;
    use crate::session::{NullPresenter, Session, SessionParts};
    use crate::speech::{AudioToggle, MockSynthesizer};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn create_test_handler() -> (DaemonCommandHandler, Arc<MockAnswerService>) {
        let mut config = Config::default();
        config.timing.final_debounce_ms = 10;
        config.timing.typewriter_ms = 1;
        config.timing.cooldown_ms = 5;

        let (tx, rx) = mpsc::unbounded_channel();
        let (engine, feed) = feed_engine("test", tx);
        let answers = Arc::new(MockAnswerService::new("Lead with impact"));
        let parts = SessionParts {
            engine: Box::new(engine),
            events: rx,
            answers: answers.clone(),
            synthesizer: Arc::new(MockSynthesizer::new()),
            history: Arc::new(NullHistory),
            presenter: Box::new(NullPresenter),
        };
        let (session, handle) = Session::new(&config, AudioToggle::new(false), parts);
        tokio::spawn(session.run());
        (DaemonCommandHandler::new(handle, feed), answers)
    }

    async fn status(handler: &DaemonCommandHandler) -> crate::controller::Snapshot {
        match handler.handle(Command::Status).await {
            Response::Status(snapshot) => snapshot,
            other => panic!("Expected Status response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_handler_status_starts_idle() {
        let (handler, _) = create_test_handler();
        let snapshot = status(&handler).await;
        assert_eq!(snapshot.mode, Mode::Idle);
        assert_eq!(snapshot.turn, TurnState::Idle);
        assert!(!snapshot.audio_enabled);
    }

    #[tokio::test]
    async fn test_fragment_when_not_listening() {
        let (handler, _) = create_test_handler();
        let response = handler
            .handle(Command::Fragment {
                text: "what is your biggest weakness".into(),
                is_final: true,
            })
            .await;
        assert_eq!(response, Response::error("Not listening"));
    }

    #[tokio::test]
    async fn test_live_fragment_reaches_answer_service() {
        let (handler, answers) = create_test_handler();
        assert_eq!(handler.handle(Command::Live).await, Response::Ok);
        assert_eq!(status(&handler).await.mode, Mode::Live);

        let mut accepted = false;
        for _ in 0..100 {
            let response = handler
                .handle(Command::Fragment {
                    text: "what is your biggest weakness".into(),
                    is_final: true,
                })
                .await;
            if response == Response::Ok {
                accepted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(accepted);

        tokio::time::timeout(Duration::from_secs(5), async {
            while answers.asked().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(answers.asked(), vec!["what is your biggest weakness"]);
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let (handler, _) = create_test_handler();
        let response = handler
            .handle(Command::Ask {
                question: "  ".into(),
            })
            .await;
        assert_eq!(response, Response::error("Question is empty"));
    }

    #[tokio::test]
    async fn test_audio_toggle_is_reported() {
        let (handler, _) = create_test_handler();
        assert_eq!(
            handler.handle(Command::Audio { enabled: true }).await,
            Response::Ok
        );
        assert!(status(&handler).await.audio_enabled);
    }

    #[tokio::test]
    async fn test_commands_after_shutdown_report_errors() {
        let (handler, _) = create_test_handler();
        assert_eq!(handler.handle(Command::Shutdown).await, Response::Ok);
        let mut closed = false;
        for _ in 0..100 {
            if let Response::Error { message } = handler.handle(Command::Status).await {
                assert!(message.contains("no longer running"));
                closed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(closed);
    }
}
