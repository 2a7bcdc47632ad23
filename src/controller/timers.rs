//! Deadline table for the controller's timers.
//!
//! Each kind has at most one armed deadline; arming replaces it, so a
//! superseded timer can never fire.

use std::time::{Duration, Instant};

/// Timer kinds in tie-break order: when several are due at the same
/// instant, the earlier variant fires first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimerKind {
    FinalDebounce,
    InterimDebounce,
    Fallback,
    Typewriter,
    Cooldown,
    RecognitionRestart,
}

impl TimerKind {
    pub const ALL: [TimerKind; 6] = [
        TimerKind::FinalDebounce,
        TimerKind::InterimDebounce,
        TimerKind::Fallback,
        TimerKind::Typewriter,
        TimerKind::Cooldown,
        TimerKind::RecognitionRestart,
    ];

    /// Timers owned by the submission scheduler.
    pub const SUBMISSION: [TimerKind; 3] = [
        TimerKind::FinalDebounce,
        TimerKind::InterimDebounce,
        TimerKind::Fallback,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timers {
    slots: [Option<Instant>; 6],
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `kind` to fire `after` from `now`, replacing any earlier deadline.
    pub fn arm(&mut self, kind: TimerKind, now: Instant, after: Duration) {
        self.slots[kind.index()] = Some(now + after);
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.slots[kind.index()] = None;
    }

    pub fn cancel_all(&mut self) {
        self.slots = [None; 6];
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.slots[kind.index()]
    }

    /// Earliest armed deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots.iter().flatten().min().copied()
    }

    /// Disarm and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerKind, Instant)> {
        let mut due: Option<(TimerKind, Instant)> = None;
        for kind in TimerKind::ALL {
            if let Some(deadline) = self.slots[kind.index()]
                && deadline <= now
                && due.is_none_or(|(_, best)| deadline < best)
            {
                due = Some((kind, deadline));
            }
        }
        if let Some((kind, _)) = due {
            self.cancel(kind);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_replaces_previous_deadline() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.arm(TimerKind::FinalDebounce, start, Duration::from_millis(100));
        timers.arm(TimerKind::FinalDebounce, start, Duration::from_millis(500));
        assert_eq!(
            timers.deadline(TimerKind::FinalDebounce),
            Some(start + Duration::from_millis(500))
        );
        assert!(timers.pop_due(start + Duration::from_millis(100)).is_none());
    }

    #[test]
    fn pop_due_returns_earliest_first() {
        let start = Instant::now();
        let mut timers = Timers::new();
        timers.arm(TimerKind::Fallback, start, Duration::from_millis(50));
        timers.arm(TimerKind::FinalDebounce, start, Duration::from_millis(80));

        let now = start + Duration::from_millis(100);
        assert_eq!(timers.pop_due(now).map(|(k, _)| k), Some(TimerKind::Fallback));
        assert_eq!(
            timers.pop_due(now).map(|(k, _)| k),
            Some(TimerKind::FinalDebounce)
        );
        assert!(timers.pop_due(now).is_none());
    }

    #[test]
    fn ties_resolve_in_kind_order() {
        let start = Instant::now();
        let mut timers = Timers::new();
        let after = Duration::from_millis(10);
        timers.arm(TimerKind::Fallback, start, after);
        timers.arm(TimerKind::InterimDebounce, start, after);
        timers.arm(TimerKind::FinalDebounce, start, after);

        let now = start + after;
        assert_eq!(
            timers.pop_due(now).map(|(k, _)| k),
            Some(TimerKind::FinalDebounce)
        );
    }

    #[test]
    fn next_deadline_and_cancel() {
        let start = Instant::now();
        let mut timers = Timers::new();
        assert_eq!(timers.next_deadline(), None);
        timers.arm(TimerKind::Cooldown, start, Duration::from_millis(500));
        timers.arm(TimerKind::Typewriter, start, Duration::from_millis(30));
        assert_eq!(
            timers.next_deadline(),
            Some(start + Duration::from_millis(30))
        );
        timers.cancel(TimerKind::Typewriter);
        assert!(!timers.is_armed(TimerKind::Typewriter));
        timers.cancel_all();
        assert_eq!(timers.next_deadline(), None);
    }
}
