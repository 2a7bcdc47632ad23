//! Async runtime around the [`Controller`].
//!
//! One task owns the controller and drives it from a `select!` loop over
//! user commands, recognition events, completed background work and the
//! controller's next timer deadline. Effects are executed here: network and
//! speech run in spawned tasks whose results re-enter as [`Input`]s.

use crate::config::Config;
use crate::controller::{Controller, Effect, Input, Presentation, Snapshot, TurnState, UserAction};
use crate::delivery::AnswerService;
use crate::error::{IntervoiceError, Result};
use crate::history::HistoryStore;
use crate::recognition::{RecognitionEvent, SpeechEngine};
use crate::speech::{AudioToggle, SynthesisError, Synthesizer, VoiceParams};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Renders presentation updates.
pub trait Presenter: Send {
    fn present(&mut self, update: &Presentation);
}

/// Drops every update.
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn present(&mut self, _update: &Presentation) {}
}

/// Commands accepted by a running session.
#[derive(Debug)]
pub enum SessionCommand {
    User(UserAction),
    SetAudio(bool),
    Status(oneshot::Sender<Snapshot>),
    Shutdown,
}

/// Cloneable control handle for a running [`Session`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn send(&self, action: UserAction) -> Result<()> {
        self.command(SessionCommand::User(action))
    }

    pub fn set_audio(&self, enabled: bool) -> Result<()> {
        self.command(SessionCommand::SetAudio(enabled))
    }

    pub async fn status(&self) -> Result<Snapshot> {
        let (tx, rx) = oneshot::channel();
        self.command(SessionCommand::Status(tx))?;
        rx.await.map_err(|_| IntervoiceError::SessionClosed)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.command(SessionCommand::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn command(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| IntervoiceError::SessionClosed)
    }
}

/// Collaborators a session drives.
pub struct SessionParts {
    pub engine: Box<dyn SpeechEngine>,
    /// Receiving end of the channel the engine reports on.
    pub events: mpsc::UnboundedReceiver<RecognitionEvent>,
    pub answers: Arc<dyn AnswerService>,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub history: Arc<dyn HistoryStore>,
    pub presenter: Box<dyn Presenter>,
}

pub struct Session {
    controller: Controller,
    audio: AudioToggle,
    engine: Box<dyn SpeechEngine>,
    events: mpsc::UnboundedReceiver<RecognitionEvent>,
    answers: Arc<dyn AnswerService>,
    synthesizer: Arc<dyn Synthesizer>,
    history: Arc<dyn HistoryStore>,
    presenter: Box<dyn Presenter>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    results_tx: mpsc::UnboundedSender<Input>,
    results: mpsc::UnboundedReceiver<Input>,
    /// Bumped on every speech cancel. Speak tasks spawned earlier stop even
    /// if they have not started playing yet.
    speech_epoch: watch::Sender<u64>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    pub fn new(config: &Config, audio: AudioToggle, parts: SessionParts) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (results_tx, results) = mpsc::unbounded_channel();
        let session = Self {
            controller: Controller::new(config, audio.clone()),
            audio,
            engine: parts.engine,
            events: parts.events,
            answers: parts.answers,
            synthesizer: parts.synthesizer,
            history: parts.history,
            presenter: parts.presenter,
            commands,
            results_tx,
            results,
            speech_epoch: watch::Sender::new(0),
            tasks: Vec::new(),
        };
        let handle = SessionHandle {
            commands: commands_tx,
        };
        (session, handle)
    }

    /// Run until shutdown or until every handle is dropped.
    pub async fn run(mut self) -> Result<()> {
        info!(
            "Session started (engine: {}, answers: {}, speech: {})",
            self.engine.name(),
            self.answers.name(),
            self.synthesizer.name()
        );

        loop {
            let deadline = self.controller.next_deadline();
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(SessionCommand::User(action)) => self.apply(Input::User(action)).await,
                    Some(SessionCommand::SetAudio(enabled)) => self.set_audio(enabled),
                    Some(SessionCommand::Status(reply)) => {
                        if reply.send(self.controller.snapshot()).is_err() {
                            debug!("Status requester went away");
                        }
                    }
                    Some(SessionCommand::Shutdown) | None => break,
                },
                Some(event) = self.events.recv() => {
                    self.apply(Input::Recognition(event)).await;
                }
                Some(input) = self.results.recv() => self.apply(input).await,
                _ = sleep_until(deadline) => {
                    let effects = self.controller.advance(Instant::now());
                    self.execute(effects).await;
                }
            }
            self.tasks.retain(|task| !task.is_finished());
        }

        self.engine.stop().await;
        self.cancel_speech();
        for task in self.tasks.drain(..) {
            task.abort();
        }
        info!("Session stopped");
        Ok(())
    }

    async fn apply(&mut self, input: Input) {
        let effects = self.controller.handle(input, Instant::now());
        self.execute(effects).await;
    }

    /// Carry out effects in order. A failed engine start feeds back into the
    /// controller before later effects run.
    async fn execute(&mut self, effects: Vec<Effect>) {
        let mut queue = VecDeque::from(effects);
        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::StartRecognition => {
                    if let Err(error) = self.engine.start().await {
                        let input = Input::Recognition(RecognitionEvent::StartFailed(error));
                        let more = self.controller.handle(input, Instant::now());
                        queue.extend(more);
                    }
                }
                Effect::StopRecognition => self.engine.stop().await,
                Effect::Dispatch { turn, question } => {
                    let answers = Arc::clone(&self.answers);
                    let results = self.results_tx.clone();
                    self.tasks.push(tokio::spawn(async move {
                        let result = answers.ask(&question).await;
                        if results.send(Input::Answer { turn, result }).is_err() {
                            debug!("Session gone, dropping answer for {}", turn);
                        }
                    }));
                }
                Effect::RecordHistory { question, answer } => {
                    if let Err(e) = self.history.record(&question, &answer) {
                        warn!("Failed to record history: {}", e);
                    }
                }
                Effect::Speak { turn, text, voice } => {
                    let synthesizer = Arc::clone(&self.synthesizer);
                    let results = self.results_tx.clone();
                    let cancelled = self.speech_epoch.subscribe();
                    self.tasks.push(tokio::spawn(async move {
                        let outcome =
                            speak_unless_cancelled(&*synthesizer, &text, &voice, cancelled).await;
                        if results.send(Input::Speech { turn, outcome }).is_err() {
                            debug!("Session gone, dropping speech result for {}", turn);
                        }
                    }));
                }
                Effect::Announce { text, voice } => {
                    let synthesizer = Arc::clone(&self.synthesizer);
                    let cancelled = self.speech_epoch.subscribe();
                    self.tasks.push(tokio::spawn(async move {
                        if let Err(e) =
                            speak_unless_cancelled(&*synthesizer, &text, &voice, cancelled).await
                        {
                            debug!("Announcement not spoken: {}", e);
                        }
                    }));
                }
                Effect::CancelSpeech => self.cancel_speech(),
                Effect::Present(update) => self.presenter.present(&update),
            }
        }
    }

    fn set_audio(&mut self, enabled: bool) {
        let previous = self.audio.set(enabled);
        if previous == enabled {
            return;
        }
        info!("Audio {}", if enabled { "enabled" } else { "disabled" });
        // The speak task then reports Interrupted and the turn completes.
        if !enabled && self.controller.turn_state() == TurnState::Speaking {
            self.cancel_speech();
        }
        self.presenter.present(&Presentation::Notice(format!(
            "Audio {}.",
            if enabled { "on" } else { "off" }
        )));
    }

    fn cancel_speech(&self) {
        self.speech_epoch.send_modify(|epoch| *epoch += 1);
        self.synthesizer.cancel();
    }
}

/// Speak `text`, giving up as soon as a cancel lands after `cancelled` was
/// subscribed. Dropping the pending `speak` stops playback.
async fn speak_unless_cancelled(
    synthesizer: &dyn Synthesizer,
    text: &str,
    voice: &VoiceParams,
    mut cancelled: watch::Receiver<u64>,
) -> std::result::Result<(), SynthesisError> {
    tokio::select! {
        biased;
        changed = cancelled.changed() => {
            if changed.is_err() {
                // Session gone; nobody wants this utterance.
                debug!("Speech dropped, session stopped");
            }
            Err(SynthesisError::Interrupted)
        }
        outcome = synthesizer.speak(text, voice) => outcome,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
