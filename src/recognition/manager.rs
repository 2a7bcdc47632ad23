//! Recognition supervisor.
//!
//! Tracks whether capture should be running and decides what to do when the
//! engine ends or fails. It performs no I/O itself: every decision is
//! returned to the controller, which turns it into effects and timers.

use super::engine::EngineErrorCode;
use super::error::RecognitionError;
use crate::config::RecognitionConfig;
use std::time::Duration;

/// Longest restart delay regardless of failure count.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    /// No capture wanted.
    Stopped,
    /// Capture requested and expected to be running.
    Listening,
    /// Capture paused while a turn is delivered; resumed afterwards.
    Suspended,
    /// Waiting on the backoff timer before starting again.
    Restarting { attempt: u32 },
}

/// What to do after the engine ends on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndAction {
    /// Continuous mode: start again after `delay`.
    Restart { delay: Duration },
    /// Push-to-talk: tell the user capture stopped, leave control to them.
    Notify,
    /// Nothing was listening.
    Ignore,
}

/// What to do after an engine error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorAction {
    Ignore,
    /// Offer typed input instead; `stop` when capture should end too.
    PromptTextEntry { stop: bool },
    /// Stop the engine and start again after `delay`.
    Retry { delay: Duration },
    /// Give up; the error is surfaced to the user.
    Abort(RecognitionError),
}

#[derive(Debug, Clone)]
pub struct RecognitionManager {
    state: ManagerState,
    failures: u32,
    max_attempts: u32,
    backoff: Duration,
}

impl RecognitionManager {
    pub fn new(config: &RecognitionConfig) -> Self {
        Self {
            state: ManagerState::Stopped,
            failures: 0,
            max_attempts: config.max_restart_attempts,
            backoff: config.restart_backoff(),
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Capture is running or will be shortly.
    pub fn is_active(&self) -> bool {
        self.state != ManagerState::Stopped
    }

    pub fn is_listening(&self) -> bool {
        self.state == ManagerState::Listening
    }

    /// Request capture. Returns `true` when the engine must be started.
    pub fn start(&mut self) -> bool {
        if self.state == ManagerState::Listening {
            return false;
        }
        self.state = ManagerState::Listening;
        true
    }

    /// Halt capture. Returns `true` when the engine may still be running.
    pub fn stop(&mut self) -> bool {
        let was = self.state;
        self.state = ManagerState::Stopped;
        self.failures = 0;
        was == ManagerState::Listening
    }

    /// Pause capture for the duration of a turn. Returns `true` when the
    /// engine must be stopped.
    pub fn suspend(&mut self) -> bool {
        match self.state {
            ManagerState::Listening => {
                self.state = ManagerState::Suspended;
                true
            }
            ManagerState::Restarting { .. } => {
                self.state = ManagerState::Suspended;
                false
            }
            ManagerState::Stopped | ManagerState::Suspended => false,
        }
    }

    /// A fragment arrived. Returns whether it should be processed.
    pub fn on_fragment(&mut self) -> bool {
        if self.state != ManagerState::Listening {
            return false;
        }
        self.failures = 0;
        true
    }

    /// The engine ended on its own.
    pub fn on_end(&mut self, continuous: bool) -> EndAction {
        if self.state != ManagerState::Listening {
            return EndAction::Ignore;
        }
        if continuous {
            self.state = ManagerState::Restarting {
                attempt: self.failures,
            };
            EndAction::Restart {
                delay: self.delay_for(self.failures),
            }
        } else {
            self.state = ManagerState::Stopped;
            EndAction::Notify
        }
    }

    /// The engine reported an error code.
    pub fn on_error(&mut self, code: &EngineErrorCode, continuous: bool) -> ErrorAction {
        if self.state != ManagerState::Listening {
            return ErrorAction::Ignore;
        }
        match code.classify() {
            None => ErrorAction::Ignore,
            Some(error) => self.handle_failure(error, continuous),
        }
    }

    /// `SpeechEngine::start` failed.
    pub fn on_start_failed(&mut self, error: RecognitionError, continuous: bool) -> ErrorAction {
        if self.state != ManagerState::Listening {
            return ErrorAction::Ignore;
        }
        self.handle_failure(error, continuous)
    }

    /// The restart timer fired. Returns `true` when the engine must be started.
    pub fn restart_due(&mut self) -> bool {
        if matches!(self.state, ManagerState::Restarting { .. }) {
            self.state = ManagerState::Listening;
            true
        } else {
            false
        }
    }

    fn handle_failure(&mut self, error: RecognitionError, continuous: bool) -> ErrorAction {
        match error {
            RecognitionError::NoSpeechDetected => {
                // Live capture keeps going; the engine's end restarts it.
                if !continuous {
                    self.state = ManagerState::Stopped;
                }
                ErrorAction::PromptTextEntry { stop: !continuous }
            }
            RecognitionError::Transient { message } => {
                self.failures += 1;
                if self.failures > self.max_attempts {
                    let attempts = self.failures - 1;
                    self.state = ManagerState::Stopped;
                    self.failures = 0;
                    ErrorAction::Abort(RecognitionError::EngineUnavailable {
                        reason: format!("{} (gave up after {} restarts)", message, attempts),
                    })
                } else {
                    let attempt = self.failures;
                    self.state = ManagerState::Restarting { attempt };
                    ErrorAction::Retry {
                        delay: self.delay_for(attempt - 1),
                    }
                }
            }
            fatal => {
                self.state = ManagerState::Stopped;
                self.failures = 0;
                ErrorAction::Abort(fatal)
            }
        }
    }

    fn delay_for(&self, exponent: u32) -> Duration {
        let factor = 1u32 << exponent.min(16);
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> RecognitionManager {
        RecognitionManager::new(&RecognitionConfig::default())
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut m = manager();
        assert!(m.start());
        assert!(!m.start());
        assert!(m.stop());
        assert!(!m.stop());
        assert_eq!(m.state(), ManagerState::Stopped);
    }

    #[test]
    fn end_restarts_only_in_continuous_mode() {
        let mut m = manager();
        m.start();
        assert_eq!(
            m.on_end(true),
            EndAction::Restart {
                delay: Duration::from_millis(300)
            }
        );
        assert!(m.restart_due());
        assert!(m.is_listening());

        assert_eq!(m.on_end(false), EndAction::Notify);
        assert_eq!(m.state(), ManagerState::Stopped);
    }

    #[test]
    fn end_after_stop_is_ignored() {
        let mut m = manager();
        m.start();
        m.stop();
        assert_eq!(m.on_end(true), EndAction::Ignore);
        assert!(!m.restart_due());
    }

    #[test]
    fn end_while_suspended_is_ignored() {
        let mut m = manager();
        m.start();
        assert!(m.suspend());
        assert_eq!(m.on_end(true), EndAction::Ignore);
        assert!(!m.on_fragment());
        assert!(m.start());
    }

    #[test]
    fn transient_errors_back_off_then_escalate() {
        let mut m = manager();
        m.start();

        for expected_ms in [300u64, 600, 1200] {
            assert_eq!(
                m.on_error(&EngineErrorCode::Network, true),
                ErrorAction::Retry {
                    delay: Duration::from_millis(expected_ms)
                }
            );
            assert!(m.restart_due());
        }

        match m.on_error(&EngineErrorCode::Network, true) {
            ErrorAction::Abort(error) => {
                assert!(matches!(error, RecognitionError::EngineUnavailable { .. }));
                assert!(error.is_mode_ending());
            }
            other => panic!("Expected Abort, got {:?}", other),
        }
        assert_eq!(m.state(), ManagerState::Stopped);
    }

    #[test]
    fn fragment_resets_failure_count() {
        let mut m = manager();
        m.start();
        m.on_error(&EngineErrorCode::Network, true);
        m.restart_due();
        m.on_error(&EngineErrorCode::Network, true);
        m.restart_due();
        assert!(m.on_fragment());
        assert_eq!(
            m.on_error(&EngineErrorCode::Network, true),
            ErrorAction::Retry {
                delay: Duration::from_millis(300)
            }
        );
    }

    #[test]
    fn fatal_errors_abort() {
        let mut m = manager();
        m.start();
        assert_eq!(
            m.on_error(&EngineErrorCode::NotAllowed, true),
            ErrorAction::Abort(RecognitionError::PermissionDenied)
        );

        m.start();
        assert!(matches!(
            m.on_error(&EngineErrorCode::AudioCapture, false),
            ErrorAction::Abort(RecognitionError::AudioCaptureFailure { .. })
        ));
        assert!(!m.is_active());
    }

    #[test]
    fn no_speech_prompts_text_entry() {
        let mut m = manager();
        m.start();
        assert_eq!(
            m.on_error(&EngineErrorCode::NoSpeech, true),
            ErrorAction::PromptTextEntry { stop: false }
        );
        assert!(m.is_listening());

        assert_eq!(
            m.on_error(&EngineErrorCode::NoSpeech, false),
            ErrorAction::PromptTextEntry { stop: true }
        );
        assert!(!m.is_active());
    }

    #[test]
    fn aborted_is_benign() {
        let mut m = manager();
        m.start();
        assert_eq!(
            m.on_error(&EngineErrorCode::Aborted, true),
            ErrorAction::Ignore
        );
        assert!(m.is_listening());
    }

    #[test]
    fn start_failure_uses_the_same_policy() {
        let mut m = manager();
        m.start();
        assert_eq!(
            m.on_start_failed(RecognitionError::PermissionDenied, false),
            ErrorAction::Abort(RecognitionError::PermissionDenied)
        );
    }

    #[test]
    fn backoff_is_capped() {
        let config = RecognitionConfig {
            max_restart_attempts: 100,
            restart_backoff_ms: 1000,
            ..RecognitionConfig::default()
        };
        let mut m = RecognitionManager::new(&config);
        m.start();
        let mut last = Duration::ZERO;
        for _ in 0..20 {
            if let ErrorAction::Retry { delay } = m.on_error(&EngineErrorCode::Network, true) {
                last = delay;
            }
            m.restart_due();
        }
        assert_eq!(last, MAX_BACKOFF);
    }
}
