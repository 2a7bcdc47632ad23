//! Answer delivery: dispatch to the answer service, answer formatting and
//! the typewriter reveal.

pub mod dispatcher;
pub mod error;
pub mod format;
pub mod http;
pub mod service;
pub mod typewriter;
pub mod ws;

pub use dispatcher::{AnswerDispatcher, ServiceEndpoints};
pub use error::DeliveryError;
pub use format::{format_answer, speech_text};
pub use http::HttpAnswerService;
pub use service::{AnswerService, AskRequest, AskResponse, ChannelMessage, MockAnswerService};
pub use typewriter::Typewriter;
pub use ws::WsAnswerChannel;
