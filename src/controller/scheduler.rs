//! Submission scheduling: turns a stream of detections into at most one
//! dispatch per spoken turn.
//!
//! Three timers cooperate. A short debounce follows a final fragment, a
//! longer one follows a complete-looking interim fragment, and a fallback
//! guarantees progress when the engine never finalises. Whichever fires
//! first consumes the pending submission and disarms the other two.

use super::detector::{DetectedQuestion, FragmentSource};
use super::timers::{TimerKind, Timers};
use crate::config::{DetectionConfig, TimingConfig};
use std::time::{Duration, Instant};

/// The one outstanding submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub question: String,
    pub scheduled_at: Instant,
    pub source: FragmentSource,
}

/// Which dispatch path a detection armed, besides the fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePath {
    Final,
    Interim,
    FallbackOnly,
}

#[derive(Debug, Clone)]
pub struct SubmissionScheduler {
    pending: Option<PendingSubmission>,
    final_delay: Duration,
    interim_delay: Duration,
    fallback_delay: Duration,
    interim_complete_chars: usize,
}

impl SubmissionScheduler {
    pub fn new(timing: &TimingConfig, detection: &DetectionConfig) -> Self {
        Self {
            pending: None,
            final_delay: timing.final_debounce(),
            interim_delay: timing.interim_debounce(),
            fallback_delay: timing.fallback(),
            interim_complete_chars: detection.interim_complete_chars,
        }
    }

    pub fn pending(&self) -> Option<&PendingSubmission> {
        self.pending.as_ref()
    }

    /// Replace the pending submission with `detected` and re-arm timers.
    pub fn schedule(
        &mut self,
        detected: &DetectedQuestion,
        timers: &mut Timers,
        now: Instant,
    ) -> SchedulePath {
        let final_armed = timers.is_armed(TimerKind::FinalDebounce);
        timers.cancel(TimerKind::FinalDebounce);
        timers.cancel(TimerKind::InterimDebounce);

        let path = match detected.source {
            FragmentSource::Final => SchedulePath::Final,
            // A continuation after a final fragment stays on the final path.
            FragmentSource::Interim if final_armed => SchedulePath::Final,
            FragmentSource::Interim
                if detected.text.chars().count() > self.interim_complete_chars =>
            {
                SchedulePath::Interim
            }
            FragmentSource::Interim => SchedulePath::FallbackOnly,
        };

        match path {
            SchedulePath::Final => timers.arm(TimerKind::FinalDebounce, now, self.final_delay),
            SchedulePath::Interim => {
                timers.arm(TimerKind::InterimDebounce, now, self.interim_delay)
            }
            SchedulePath::FallbackOnly => {}
        }
        timers.arm(TimerKind::Fallback, now, self.fallback_delay);

        self.pending = Some(PendingSubmission {
            question: detected.text.clone(),
            scheduled_at: now,
            source: detected.source,
        });
        path
    }

    /// A final fragment repeated the pending text: move it onto the final
    /// path. Returns whether anything changed.
    pub fn promote_to_final(&mut self, text: &str, timers: &mut Timers, now: Instant) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };
        if timers.is_armed(TimerKind::FinalDebounce)
            || !pending.question.trim().eq_ignore_ascii_case(text.trim())
        {
            return false;
        }
        timers.cancel(TimerKind::InterimDebounce);
        timers.arm(TimerKind::FinalDebounce, now, self.final_delay);
        pending.source = FragmentSource::Final;
        true
    }

    /// A submission timer fired. Consumes the pending submission.
    pub fn fire(&mut self, kind: TimerKind, timers: &mut Timers) -> Option<PendingSubmission> {
        if !TimerKind::SUBMISSION.contains(&kind) {
            return None;
        }
        self.take_now(timers)
    }

    /// Consume the pending submission immediately (explicit send).
    pub fn take_now(&mut self, timers: &mut Timers) -> Option<PendingSubmission> {
        Self::disarm(timers);
        self.pending.take()
    }

    /// Drop the pending submission and its timers.
    pub fn cancel(&mut self, timers: &mut Timers) {
        Self::disarm(timers);
        self.pending = None;
    }

    fn disarm(timers: &mut Timers) {
        for kind in TimerKind::SUBMISSION {
            timers.cancel(kind);
        }
    }
}
