//! Software key autorepeat
//!
//! Emulates key repeat for devices whose driver does not repeat held
//! keys. One key is tracked per device; the most recent press wins.

use std::time::{Duration, Instant};

/// Autorepeat delay/period pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutorepeatTiming {
    /// Time from press to the first synthetic repeat
    pub delay: Duration,
    /// Time between subsequent repeats
    pub period: Duration,
}

/// Timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutorepeatState {
    /// No key held
    Idle,
    /// Key held, waiting for the initial delay
    Armed { code: u16, deadline: Instant },
    /// Key held, firing every period
    Repeating { code: u16, deadline: Instant },
}

/// Per-device autorepeat state machine
#[derive(Debug, Clone)]
pub struct AutorepeatTimer {
    timing: AutorepeatTiming,
    state: AutorepeatState,
}

impl AutorepeatTimer {
    pub fn new(timing: AutorepeatTiming) -> Self {
        Self {
            timing,
            state: AutorepeatState::Idle,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> AutorepeatState {
        self.state
    }

    /// Key currently being repeated, if any
    pub fn active_code(&self) -> Option<u16> {
        match self.state {
            AutorepeatState::Idle => None,
            AutorepeatState::Armed { code, .. } | AutorepeatState::Repeating { code, .. } => {
                Some(code)
            }
        }
    }

    /// Next fire time, if a key is held
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            AutorepeatState::Idle => None,
            AutorepeatState::Armed { deadline, .. }
            | AutorepeatState::Repeating { deadline, .. } => Some(deadline),
        }
    }

    /// `code` went down: it replaces whatever was held
    pub fn press(&mut self, code: u16, now: Instant) {
        self.state = AutorepeatState::Armed {
            code,
            deadline: now + self.timing.delay,
        };
    }

    /// `code` went up. Releasing a key that was already superseded is a no-op.
    pub fn release(&mut self, code: u16) {
        if self.active_code() == Some(code) {
            self.state = AutorepeatState::Idle;
        }
    }

    /// Forget the held key
    pub fn reset(&mut self) {
        self.state = AutorepeatState::Idle;
    }

    /// Fire if the deadline has passed, re-arming for one period later.
    /// Returns the code to report as a synthetic press.
    pub fn poll(&mut self, now: Instant) -> Option<u16> {
        let code = self.active_code()?;
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        self.state = AutorepeatState::Repeating {
            code,
            deadline: now + self.timing.period,
        };
        Some(code)
    }

    /// Time until the next fire, zero if overdue, `None` when idle
    pub fn time_left(&self, now: Instant) -> Option<Duration> {
        self.deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> AutorepeatTimer {
        AutorepeatTimer::new(AutorepeatTiming {
            delay: Duration::from_millis(250),
            period: Duration::from_millis(33),
        })
    }

    #[test]
    fn test_idle_until_press() {
        let mut t = timer();
        let now = Instant::now();
        assert_eq!(t.state(), AutorepeatState::Idle);
        assert_eq!(t.poll(now + Duration::from_secs(5)), None);
        assert_eq!(t.time_left(now), None);
    }

    #[test]
    fn test_fires_after_delay_then_every_period() {
        let mut t = timer();
        let start = Instant::now();
        t.press(0x160, start);
        assert_eq!(t.time_left(start), Some(Duration::from_millis(250)));

        assert_eq!(t.poll(start + Duration::from_millis(249)), None);
        assert!(matches!(t.state(), AutorepeatState::Armed { code: 0x160, .. }));

        let first = start + Duration::from_millis(250);
        assert_eq!(t.poll(first), Some(0x160));
        assert!(matches!(t.state(), AutorepeatState::Repeating { code: 0x160, .. }));
        assert_eq!(t.time_left(first), Some(Duration::from_millis(33)));

        assert_eq!(t.poll(first + Duration::from_millis(32)), None);
        assert_eq!(t.poll(first + Duration::from_millis(33)), Some(0x160));
    }

    #[test]
    fn test_release_of_active_key_stops() {
        let mut t = timer();
        let start = Instant::now();
        t.press(103, start);
        t.release(103);
        assert_eq!(t.state(), AutorepeatState::Idle);
        assert_eq!(t.poll(start + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_last_press_wins() {
        let mut t = timer();
        let start = Instant::now();
        t.press(103, start);
        t.press(108, start + Duration::from_millis(10));
        // Releasing the superseded key leaves the new one repeating
        t.release(103);
        assert_eq!(t.active_code(), Some(108));
        assert_eq!(t.poll(start + Duration::from_millis(260)), Some(108));
    }

    #[test]
    fn test_time_left_saturates_when_overdue() {
        let mut t = timer();
        let start = Instant::now();
        t.press(103, start);
        assert_eq!(t.time_left(start + Duration::from_secs(1)), Some(Duration::ZERO));
    }
}
