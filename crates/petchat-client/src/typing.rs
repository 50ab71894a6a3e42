//! Typing indicator debounce.
//!
//! The first non-blank keystroke starts typing. Every keystroke pushes the
//! idle deadline back; once the input has been idle for the configured
//! window, a tick stops typing. Clearing the input or sending a message
//! stops it at once.
//!
//! Time is passed in, so the debouncer works on a virtual clock in tests.

use std::{ops::Sub, time::Duration};

/// Idle window after the last keystroke before typing stops.
pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_secs(1);

/// Debounce configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingConfig {
    /// Idle window.
    pub idle: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self { idle: DEFAULT_TYPING_IDLE }
    }
}

/// Turns keystrokes into typing start/stop transitions.
///
/// Each method returns `Some(is_typing)` when an indicator should be sent.
#[derive(Debug, Clone)]
pub struct TypingDebouncer<I> {
    config: TypingConfig,
    typing: bool,
    last_input: Option<I>,
}

impl<I> TypingDebouncer<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create an idle debouncer.
    pub fn new(config: TypingConfig) -> Self {
        Self { config, typing: false, last_input: None }
    }

    /// Whether a typing=true indicator is outstanding.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    /// Record that the input box now contains `text`.
    pub fn input(&mut self, now: I, text: &str) -> Option<bool> {
        if text.trim().is_empty() {
            return self.stop();
        }

        self.last_input = Some(now);
        if self.typing {
            return None;
        }
        self.typing = true;
        Some(true)
    }

    /// Stop typing if the input has been idle long enough.
    pub fn tick(&mut self, now: I) -> Option<bool> {
        let last = self.last_input?;
        if now - last >= self.config.idle { self.stop() } else { None }
    }

    /// Stop typing now, e.g. after a message was sent.
    pub fn stop(&mut self) -> Option<bool> {
        self.last_input = None;
        if self.typing {
            self.typing = false;
            Some(false)
        } else {
            None
        }
    }
}

impl<I> Default for TypingDebouncer<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    fn default() -> Self {
        Self::new(TypingConfig::default())
    }
}
