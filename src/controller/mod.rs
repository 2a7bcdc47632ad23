//! Voice interaction controller.
//!
//! A synchronous state machine. Everything that happens (engine events,
//! user actions, answers, speech completions) enters through
//! [`Controller::handle`]; expired timers enter through
//! [`Controller::advance`]. Both return [`Effect`]s for the runtime to carry
//! out. The controller owns no I/O and reads the clock only through the
//! `now` it is given, so tests can replay any sequence with a synthetic clock.

pub mod detector;
pub mod mode;
pub mod scheduler;
pub mod timers;
pub mod turn;

pub use detector::{DetectedQuestion, FragmentSource, QuestionDetector, Rejection};
pub use mode::Mode;
pub use scheduler::{PendingSubmission, SchedulePath, SubmissionScheduler};
pub use timers::{TimerKind, Timers};
pub use turn::{Turn, TurnId, TurnState};

use crate::config::Config;
use crate::defaults;
use crate::delivery::{DeliveryError, Typewriter, format_answer, speech_text};
use crate::recognition::{
    EndAction, ErrorAction, RecognitionError, RecognitionEvent, RecognitionManager,
    TranscriptFragment,
};
use crate::speech::{AudioToggle, SynthesisError, VoiceParams};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Something the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Push-to-talk press: enter manual mode and capture.
    StartListening,
    /// Push-to-talk release: stop capture and send what was heard.
    StopListening,
    GoLive,
    EndLive,
    /// Send the detected question now.
    Submit,
    /// A typed question, bypassing detection.
    Ask(String),
}

/// Everything the controller reacts to, apart from its own timers.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Recognition(RecognitionEvent),
    User(UserAction),
    Answer {
        turn: TurnId,
        result: Result<String, DeliveryError>,
    },
    Speech {
        turn: TurnId,
        outcome: Result<(), SynthesisError>,
    },
}

/// Work for the runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartRecognition,
    StopRecognition,
    /// Ask the answer service; reply with `Input::Answer` for `turn`.
    Dispatch { turn: TurnId, question: String },
    /// Hand the pair to the question history store.
    RecordHistory { question: String, answer: String },
    /// Read the answer aloud; reply with `Input::Speech` for `turn`.
    Speak {
        turn: TurnId,
        text: String,
        voice: VoiceParams,
    },
    /// Fire-and-forget spoken cue.
    Announce { text: String, voice: VoiceParams },
    CancelSpeech,
    Present(Presentation),
}

/// What the user should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    ModeChanged(Mode),
    Listening(bool),
    QuestionDetected(String),
    Submitting(String),
    AnswerStarted,
    Reveal(char),
    AnswerFinished,
    /// Shown in place of an answer.
    AnswerFailed(String),
    Ready,
    Notice(String),
}

/// Point-in-time view for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub turn: TurnState,
    pub listening: bool,
    pub audio_enabled: bool,
    /// The active turn's question, else the pending one.
    pub question: Option<String>,
    pub answer: Option<String>,
}

pub struct Controller {
    mode: Mode,
    recognition: RecognitionManager,
    detector: QuestionDetector,
    scheduler: SubmissionScheduler,
    timers: Timers,
    turn: Option<Turn>,
    next_turn: u64,
    audio: AudioToggle,
    voice: VoiceParams,
    typewriter_interval: Duration,
    cooldown: Duration,
    announce_ready: bool,
}

impl Controller {
    pub fn new(config: &Config, audio: AudioToggle) -> Self {
        Self {
            mode: Mode::Idle,
            recognition: RecognitionManager::new(&config.recognition),
            detector: QuestionDetector::new(config.detection.clone()),
            scheduler: SubmissionScheduler::new(&config.timing, &config.detection),
            timers: Timers::new(),
            turn: None,
            next_turn: 1,
            audio,
            voice: VoiceParams::from(&config.speech),
            typewriter_interval: config.timing.typewriter(),
            cooldown: config.timing.cooldown(),
            announce_ready: config.speech.announce_ready,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn turn(&self) -> Option<&Turn> {
        self.turn.as_ref()
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn.as_ref().map_or(TurnState::Idle, |t| t.state)
    }

    pub fn pending(&self) -> Option<&PendingSubmission> {
        self.scheduler.pending()
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn recognition(&self) -> &RecognitionManager {
        &self.recognition
    }

    /// Earliest instant [`Controller::advance`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn snapshot(&self) -> Snapshot {
        let question = self
            .turn
            .as_ref()
            .map(|t| t.question.clone())
            .or_else(|| self.scheduler.pending().map(|p| p.question.clone()));
        let answer = self
            .turn
            .as_ref()
            .filter(|t| !t.answer.is_empty())
            .map(|t| t.answer.clone());
        Snapshot {
            mode: self.mode,
            turn: self.turn_state(),
            listening: self.recognition.is_listening(),
            audio_enabled: self.audio.is_enabled(),
            question,
            answer,
        }
    }

    /// Single entry point for external inputs.
    pub fn handle(&mut self, input: Input, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        match input {
            Input::Recognition(event) => self.on_recognition(event, now, &mut effects),
            Input::User(action) => self.on_user(action, &mut effects),
            Input::Answer { turn, result } => self.on_answer(turn, result, now, &mut effects),
            Input::Speech { turn, outcome } => self.on_speech(turn, outcome, now, &mut effects),
        }
        effects
    }

    /// Fire every timer due at or before `now`, in deadline order.
    pub fn advance(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        while let Some((kind, deadline)) = self.timers.pop_due(now) {
            self.on_timer(kind, deadline, &mut effects);
        }
        effects
    }

    fn on_recognition(&mut self, event: RecognitionEvent, now: Instant, effects: &mut Vec<Effect>) {
        match event {
            RecognitionEvent::Started => {
                if self.recognition.is_listening() {
                    effects.push(Effect::Present(Presentation::Listening(true)));
                }
            }
            RecognitionEvent::Fragment(fragment) => self.on_fragment(&fragment, now, effects),
            RecognitionEvent::Ended => match self.recognition.on_end(self.mode.is_live()) {
                EndAction::Restart { delay } => {
                    debug!("Recognition ended, restarting in {:?}", delay);
                    self.timers.arm(TimerKind::RecognitionRestart, now, delay);
                }
                EndAction::Notify => {
                    effects.push(Effect::Present(Presentation::Listening(false)));
                    effects.push(notice("Recognition ended."));
                }
                EndAction::Ignore => {}
            },
            RecognitionEvent::Error(code) => {
                debug!("Recognition engine error: {}", code);
                let action = self.recognition.on_error(&code, self.mode.is_live());
                self.on_error_action(action, now, effects);
            }
            RecognitionEvent::StartFailed(error) => {
                warn!("Recognition failed to start: {}", error);
                let action = self.recognition.on_start_failed(error, self.mode.is_live());
                self.on_error_action(action, now, effects);
            }
        }
    }

    fn on_fragment(
        &mut self,
        fragment: &TranscriptFragment,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        if self.mode == Mode::Idle || !self.recognition.on_fragment() {
            debug!("Fragment ignored, not listening: {:?}", fragment.text);
            return;
        }
        if self.turn_state().is_busy() {
            debug!("Fragment dropped, turn in progress: {:?}", fragment.text);
            return;
        }

        match self.detector.detect(fragment) {
            Ok(detected) => {
                let path = self.scheduler.schedule(&detected, &mut self.timers, now);
                debug!("Question detected ({:?} path): {}", path, detected.text);
                effects.push(Effect::Present(Presentation::QuestionDetected(detected.text)));
            }
            Err(Rejection::ExactDuplicate) if fragment.is_final => {
                if self
                    .scheduler
                    .promote_to_final(&fragment.text, &mut self.timers, now)
                {
                    debug!("Final fragment confirmed pending question");
                }
            }
            Err(rejection) => debug!("Fragment rejected ({}): {:?}", rejection, fragment.text),
        }
    }

    fn on_error_action(&mut self, action: ErrorAction, now: Instant, effects: &mut Vec<Effect>) {
        match action {
            ErrorAction::Ignore => {}
            ErrorAction::PromptTextEntry { stop } => {
                if stop {
                    effects.push(Effect::StopRecognition);
                    effects.push(Effect::Present(Presentation::Listening(false)));
                }
                effects.push(notice("No speech detected. Type your question instead."));
            }
            ErrorAction::Retry { delay } => {
                debug!("Recognition retry in {:?}", delay);
                effects.push(Effect::StopRecognition);
                self.timers.arm(TimerKind::RecognitionRestart, now, delay);
            }
            ErrorAction::Abort(error) => self.abort_mode(error, effects),
        }
    }

    /// Unrecoverable recognition failure: back to Idle. An answer already
    /// being delivered is allowed to finish.
    fn abort_mode(&mut self, error: RecognitionError, effects: &mut Vec<Effect>) {
        warn!("Recognition stopped: {}", error);
        self.recognition.stop();
        self.timers.cancel(TimerKind::RecognitionRestart);
        self.scheduler.cancel(&mut self.timers);
        self.detector.reset();
        effects.push(Effect::StopRecognition);
        effects.push(Effect::Present(Presentation::Listening(false)));
        self.set_mode(Mode::Idle, effects);
        effects.push(notice(&format!("Listening stopped: {}.", error)));
    }

    fn on_user(&mut self, action: UserAction, effects: &mut Vec<Effect>) {
        match action {
            UserAction::StartListening => {
                if self.mode == Mode::Live {
                    effects.push(notice("Already listening in live mode."));
                    return;
                }
                self.set_mode(Mode::Manual, effects);
                if !self.turn_state().is_busy() && self.recognition.start() {
                    effects.push(Effect::StartRecognition);
                }
            }
            UserAction::StopListening => {
                if self.mode != Mode::Manual {
                    return;
                }
                self.stop_recognition(effects);
                self.set_mode(Mode::Idle, effects);
                if !self.turn_state().is_busy()
                    && let Some(pending) = self.scheduler.take_now(&mut self.timers)
                {
                    self.dispatch(pending.question, effects);
                }
            }
            UserAction::GoLive => {
                if self.mode == Mode::Live {
                    return;
                }
                self.clear_stale(effects);
                self.set_mode(Mode::Live, effects);
                self.announce(defaults::LIVE_STARTED_ANNOUNCEMENT, VoiceParams::NOTICE, effects);
                if self.recognition.start() {
                    effects.push(Effect::StartRecognition);
                }
            }
            UserAction::EndLive => {
                if self.mode != Mode::Live {
                    return;
                }
                self.stop_recognition(effects);
                self.clear_stale(effects);
                effects.push(Effect::CancelSpeech);
                self.timers.cancel_all();
                self.set_mode(Mode::Idle, effects);
                self.announce(defaults::LIVE_ENDED_ANNOUNCEMENT, VoiceParams::NOTICE, effects);
            }
            UserAction::Submit => {
                if self.turn_state().is_busy() {
                    effects.push(notice("Still answering the previous question."));
                    return;
                }
                match self.scheduler.take_now(&mut self.timers) {
                    Some(pending) => self.dispatch(pending.question, effects),
                    None => effects.push(notice("No question detected yet.")),
                }
            }
            UserAction::Ask(text) => {
                let question = text.trim();
                if question.is_empty() {
                    return;
                }
                if self.turn_state().is_busy() {
                    effects.push(notice("Still answering the previous question."));
                    return;
                }
                self.scheduler.cancel(&mut self.timers);
                self.dispatch(question.to_string(), effects);
            }
        }
    }

    fn on_answer(
        &mut self,
        id: TurnId,
        result: Result<String, DeliveryError>,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        let Some(turn) = self.turn.as_mut() else {
            debug!("Answer for {} arrived after the turn ended", id);
            return;
        };
        if turn.id != id || turn.state != TurnState::Submitting {
            debug!("Stale answer for {} ignored", id);
            return;
        }

        let formatted = match result {
            Ok(raw) => {
                let formatted = format_answer(&raw);
                if formatted.is_empty() {
                    Err(DeliveryError::malformed("the answer was empty"))
                } else {
                    effects.push(Effect::RecordHistory {
                        question: turn.question.clone(),
                        answer: raw,
                    });
                    Ok(formatted)
                }
            }
            Err(error) => Err(error),
        };

        match formatted {
            Ok(formatted) => {
                info!("Answer received for {}", id);
                turn.speech = speech_text(&formatted);
                turn.typewriter = Some(Typewriter::new(&formatted));
                turn.answer = formatted;
                turn.state = TurnState::Typing;
                effects.push(Effect::Present(Presentation::AnswerStarted));
                self.timers.arm(TimerKind::Typewriter, now, self.typewriter_interval);
            }
            Err(error) => {
                warn!("Answer delivery failed for {}: {}", id, error);
                turn.answer = error.user_message().to_string();
                effects.push(Effect::Present(Presentation::AnswerFailed(
                    turn.answer.clone(),
                )));
                self.finish_turn(now);
            }
        }
    }

    fn on_speech(
        &mut self,
        id: TurnId,
        outcome: Result<(), SynthesisError>,
        now: Instant,
        effects: &mut Vec<Effect>,
    ) {
        let speaking = self
            .turn
            .as_ref()
            .is_some_and(|t| t.id == id && t.state == TurnState::Speaking);
        if !speaking {
            debug!("Speech result for {} ignored", id);
            return;
        }
        match outcome {
            Ok(()) => debug!("Speech finished for {}", id),
            Err(SynthesisError::Interrupted) => debug!("Speech interrupted for {}", id),
            Err(error) => {
                warn!("Speech failed for {}: {}", id, error);
                effects.push(notice(&format!("Could not speak the answer: {}.", error)));
            }
        }
        self.finish_turn(now);
    }

    fn on_timer(&mut self, kind: TimerKind, at: Instant, effects: &mut Vec<Effect>) {
        match kind {
            TimerKind::FinalDebounce | TimerKind::InterimDebounce | TimerKind::Fallback => {
                if self.turn_state().is_busy() {
                    self.scheduler.cancel(&mut self.timers);
                    return;
                }
                if let Some(pending) = self.scheduler.fire(kind, &mut self.timers) {
                    debug!("{:?} timer dispatching", kind);
                    self.dispatch(pending.question, effects);
                }
            }
            TimerKind::Typewriter => self.type_next(at, effects),
            TimerKind::Cooldown => self.end_cooldown(effects),
            TimerKind::RecognitionRestart => {
                if self.mode != Mode::Idle && self.recognition.restart_due() {
                    effects.push(Effect::StartRecognition);
                }
            }
        }
    }

    fn type_next(&mut self, at: Instant, effects: &mut Vec<Effect>) {
        let Some(turn) = self.turn.as_mut() else {
            return;
        };
        if turn.state != TurnState::Typing {
            return;
        }
        let Some(typewriter) = turn.typewriter.as_mut() else {
            return;
        };

        if let Some(c) = typewriter.advance() {
            effects.push(Effect::Present(Presentation::Reveal(c)));
        }
        if !typewriter.is_done() {
            self.timers.arm(TimerKind::Typewriter, at, self.typewriter_interval);
            return;
        }

        effects.push(Effect::Present(Presentation::AnswerFinished));
        if self.audio.is_enabled() && !turn.speech.is_empty() {
            turn.state = TurnState::Speaking;
            effects.push(Effect::Speak {
                turn: turn.id,
                text: turn.speech.clone(),
                voice: self.voice,
            });
        } else {
            debug!("Audio disabled, skipping speech for {}", turn.id);
            self.finish_turn(at);
        }
    }

    /// Playback finished, failed or was skipped: settle, then listen again.
    fn finish_turn(&mut self, now: Instant) {
        if let Some(turn) = self.turn.as_mut() {
            turn.state = TurnState::Cooldown;
            turn.typewriter = None;
        }
        self.detector.reset();
        self.scheduler.cancel(&mut self.timers);
        self.timers.arm(TimerKind::Cooldown, now, self.cooldown);
    }

    fn end_cooldown(&mut self, effects: &mut Vec<Effect>) {
        if let Some(turn) = self.turn.take() {
            info!("Turn {} complete", turn.id);
        }
        effects.push(Effect::Present(Presentation::Ready));
        match self.mode {
            Mode::Live => {
                if self.recognition.start() {
                    effects.push(Effect::StartRecognition);
                }
                if self.announce_ready {
                    self.announce(defaults::READY_ANNOUNCEMENT, VoiceParams::READY, effects);
                }
            }
            Mode::Manual => {
                if self.recognition.start() {
                    effects.push(Effect::StartRecognition);
                }
            }
            Mode::Idle => {}
        }
    }

    fn dispatch(&mut self, question: String, effects: &mut Vec<Effect>) {
        let id = TurnId(self.next_turn);
        self.next_turn += 1;
        info!("Dispatching {}: {}", id, question);

        if self.recognition.suspend() {
            effects.push(Effect::StopRecognition);
        }
        self.timers.cancel(TimerKind::RecognitionRestart);
        // The scheduler's timers belong to the lineage being dispatched.
        self.scheduler.cancel(&mut self.timers);

        effects.push(Effect::Present(Presentation::Submitting(question.clone())));
        effects.push(Effect::Dispatch {
            turn: id,
            question: question.clone(),
        });
        self.turn = Some(Turn::new(id, question));
    }

    fn stop_recognition(&mut self, effects: &mut Vec<Effect>) {
        let was_active = self.recognition.is_active();
        self.recognition.stop();
        self.timers.cancel(TimerKind::RecognitionRestart);
        if was_active {
            effects.push(Effect::StopRecognition);
            effects.push(Effect::Present(Presentation::Listening(false)));
        }
    }

    /// Forget the pending question and abandon any turn in flight.
    fn clear_stale(&mut self, effects: &mut Vec<Effect>) {
        self.scheduler.cancel(&mut self.timers);
        self.detector.reset();
        self.timers.cancel(TimerKind::Typewriter);
        self.timers.cancel(TimerKind::Cooldown);
        if let Some(turn) = self.turn.take() {
            info!("Abandoning {} ({})", turn.id, turn.state);
            if turn.state == TurnState::Speaking {
                effects.push(Effect::CancelSpeech);
            }
        }
    }

    fn set_mode(&mut self, mode: Mode, effects: &mut Vec<Effect>) {
        if self.mode != mode {
            info!("Mode {} -> {}", self.mode, mode);
            self.mode = mode;
            effects.push(Effect::Present(Presentation::ModeChanged(mode)));
        }
    }

    fn announce(&self, text: &str, voice: VoiceParams, effects: &mut Vec<Effect>) {
        if self.audio.is_enabled() {
            effects.push(Effect::Announce {
                text: text.to_string(),
                voice,
            });
        }
    }
}

fn notice(text: &str) -> Effect {
    Effect::Present(Presentation::Notice(text.to_string()))
}
