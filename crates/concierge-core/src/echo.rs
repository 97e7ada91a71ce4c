//! Echo filter: drop recognized speech that is the robot hearing its own voice.
//!
//! `speak` publishes a [`SpeechWindow`] before each utterance is dispatched. An incoming
//! utterance whose end-of-speech timestamp falls inside the window (plus a trailing margin)
//! is treated as echo. This is a timing heuristic: a user who finishes speaking inside the
//! margin is dropped too.

use tokio::sync::watch;

/// Trailing margin after the estimated end of robot speech, seconds.
pub const DEFAULT_ECHO_MARGIN_SECS: f64 = 1.0;

/// Wall-clock source, epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// System wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Interval during which the robot's latest utterance was (estimated to be) playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeechWindow {
    pub start: f64,
    pub end: f64,
}

impl SpeechWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// True when `timestamp` lies in `[start, end + margin]`.
    pub fn covers(&self, timestamp: f64, margin: f64) -> bool {
        self.start <= timestamp && timestamp <= self.end + margin
    }
}

/// Write side of the active speech window. Only the latest window is kept.
#[derive(Debug)]
pub struct SpeechWindowPublisher {
    tx: watch::Sender<Option<SpeechWindow>>,
}

impl SpeechWindowPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn publish(&self, window: SpeechWindow) {
        self.tx.send_replace(Some(window));
    }

    pub fn latest(&self) -> Option<SpeechWindow> {
        *self.tx.borrow()
    }

    /// Build a filter that reads windows published here.
    pub fn filter(&self, margin_secs: f64) -> EchoFilter {
        EchoFilter {
            rx: self.tx.subscribe(),
            margin_secs,
        }
    }
}

impl Default for SpeechWindowPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether a recognized utterance should be stored.
#[derive(Debug, Clone)]
pub struct EchoFilter {
    rx: watch::Receiver<Option<SpeechWindow>>,
    margin_secs: f64,
}

impl EchoFilter {
    pub fn margin_secs(&self) -> f64 {
        self.margin_secs
    }

    /// Accept unless the utterance ended inside the latest speech window. With no window
    /// published yet, everything is accepted.
    pub fn should_accept(&self, utterance_end_timestamp: f64) -> bool {
        match *self.rx.borrow() {
            Some(window) => !window.covers(utterance_end_timestamp, self.margin_secs),
            None => true,
        }
    }
}
