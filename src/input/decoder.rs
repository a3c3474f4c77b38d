//! Per-device event decoding
//!
//! Turns raw evdev records into key reports: filters by type and code
//! range, tracks held modifiers, counts fast re-presses and feeds the
//! software autorepeat timer. Each gate below runs in order and a
//! rejected event stops there.

use std::time::{Duration, Instant};

use super::autorepeat::{AutorepeatTimer, AutorepeatTiming};
use super::device::RawEvent;
use super::keycodes::{modifier_for, Modifiers, EV_KEY, KEY_PRESS, KEY_RELEASE};

/// Decoder options shared by every device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderSettings {
    /// Lowest key code reported (inclusive)
    pub key_min: u16,
    /// Highest key code reported (inclusive)
    pub key_max: u16,
    /// Track modifier keys as state instead of reporting them
    pub capture_modifiers: bool,
    /// Presses of the same key closer together than this count as repeats
    pub repeat_window: Duration,
}

/// One key to announce to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyReport {
    pub code: u16,
    /// Consecutive fast presses of this key before this one
    pub repeat: u32,
    /// Modifiers held when the key went down
    pub modifiers: Modifiers,
}

/// Decode state for one device
#[derive(Debug, Clone)]
pub struct DeviceDecoder {
    settings: DecoderSettings,
    modifiers: Modifiers,
    /// Last reported code and when it was reported
    previous: Option<(u16, Instant)>,
    repeat: u32,
    /// Present only when this device needs software autorepeat
    autorepeat: Option<AutorepeatTimer>,
}

impl DeviceDecoder {
    pub fn new(settings: DecoderSettings, autorepeat: Option<AutorepeatTiming>) -> Self {
        Self {
            settings,
            modifiers: Modifiers::empty(),
            previous: None,
            repeat: 0,
            autorepeat: autorepeat.map(AutorepeatTimer::new),
        }
    }

    #[cfg(test)]
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    #[cfg(test)]
    pub fn software_autorepeat(&self) -> bool {
        self.autorepeat.is_some()
    }

    /// Process one raw event, returning the key to report, if any
    pub fn decode(&mut self, event: &RawEvent, now: Instant) -> Option<KeyReport> {
        if event.kind != EV_KEY {
            return None;
        }

        if event.code < self.settings.key_min || event.code > self.settings.key_max {
            return None;
        }

        if self.settings.capture_modifiers {
            if let Some(modifier) = modifier_for(event.code) {
                self.modifiers.set(modifier, event.value != KEY_RELEASE);
                return None;
            }
        }

        // Releases must reach the timer so they cancel an in-flight repeat
        if let Some(timer) = self.autorepeat.as_mut() {
            match event.value {
                KEY_RELEASE => timer.release(event.code),
                KEY_PRESS => timer.press(event.code, now),
                _ => {}
            }
        }

        if event.value == KEY_RELEASE {
            return None;
        }

        Some(self.report(event.code, now))
    }

    /// Emit a synthetic press if the autorepeat deadline has passed
    pub fn poll_autorepeat(&mut self, now: Instant) -> Option<KeyReport> {
        let code = self.autorepeat.as_mut()?.poll(now)?;
        Some(self.report(code, now))
    }

    /// When the autorepeat timer next needs attention
    #[cfg(test)]
    pub fn autorepeat_deadline(&self) -> Option<Instant> {
        self.autorepeat.as_ref().and_then(AutorepeatTimer::deadline)
    }

    /// Time until the autorepeat timer fires, `None` when nothing is held
    pub fn autorepeat_time_left(&self, now: Instant) -> Option<Duration> {
        self.autorepeat.as_ref().and_then(|timer| timer.time_left(now))
    }

    /// Drop state that only makes sense while the device is attached:
    /// held modifiers and the held autorepeat key.
    pub fn reset_held_state(&mut self) {
        self.modifiers = Modifiers::empty();
        if let Some(timer) = self.autorepeat.as_mut() {
            timer.reset();
        }
    }

    fn report(&mut self, code: u16, now: Instant) -> KeyReport {
        let within_window = matches!(
            self.previous,
            Some((prev_code, at)) if prev_code == code
                && now.saturating_duration_since(at) < self.settings.repeat_window
        );
        self.repeat = if within_window { self.repeat + 1 } else { 0 };
        self.previous = Some((code, now));

        KeyReport {
            code,
            repeat: self.repeat,
            modifiers: self.modifiers,
        }
    }
}
