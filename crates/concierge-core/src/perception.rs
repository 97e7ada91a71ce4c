//! Shared perception state: named slots written by feed handlers and awaited by the
//! control loop.
//!
//! Each slot wraps a `tokio::sync::watch` channel. Writers replace the value without
//! blocking; consumers suspend until the stored value differs from the snapshot they took
//! when they started waiting.

use crate::error::{ConciergeError, ConciergeResult};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tokio::sync::watch;
use tracing::debug;

/// A recognized user utterance and the wall-clock time (epoch seconds) its speech ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    pub text: String,
    pub end_timestamp: f64,
}

impl Utterance {
    pub fn new(text: impl Into<String>, end_timestamp: f64) -> Self {
        Self {
            text: text.into(),
            end_timestamp,
        }
    }
}

/// A single-producer, many-consumer value with "wait for change" semantics.
///
/// The value starts unset and is only ever replaced, never cleared.
pub struct Slot<T> {
    name: &'static str,
    tx: watch::Sender<Option<T>>,
}

impl<T> Slot<T>
where
    T: Clone + PartialEq + Debug + Send + Sync,
{
    pub fn new(name: &'static str) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { name, tx }
    }

    /// Slot name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replace the current value. Never blocks and never fails.
    pub fn set(&self, value: T) {
        debug!(target: "concierge::perception", slot = self.name, value = ?value, "slot updated");
        self.tx.send_replace(Some(value));
    }

    /// Non-blocking snapshot of the current value.
    pub fn current(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Number of consumers currently suspended in [`Slot::wait_for_change`].
    pub fn waiters(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Suspend until the stored value differs from the one present at call entry, then
    /// return the new value.
    ///
    /// Writes that store an equal value do not wake the caller. There is no timeout.
    pub async fn wait_for_change(&self) -> ConciergeResult<T> {
        let mut rx = self.tx.subscribe();
        let snapshot = rx.borrow_and_update().clone();
        debug!(target: "concierge::perception", slot = self.name, "waiting for a new value");

        loop {
            rx.changed()
                .await
                .map_err(|_| ConciergeError::SlotClosed(self.name))?;
            let latest = rx.borrow_and_update().clone();
            if latest != snapshot {
                if let Some(value) = latest {
                    debug!(target: "concierge::perception", slot = self.name, value = ?value, "new value");
                    return Ok(value);
                }
            }
        }
    }
}

/// The three perception slots shared between feed handlers and the control loop.
pub struct PerceptionState {
    /// Signed direction of the speaking user, degrees.
    pub bearing: Slot<f64>,
    /// Latest recognized utterance that passed the echo filter.
    pub utterance: Slot<Utterance>,
    /// Front obstacle distance, meters.
    pub distance: Slot<f64>,
}

impl PerceptionState {
    pub fn new() -> Self {
        Self {
            bearing: Slot::new("user_bearing"),
            utterance: Slot::new("recognized_utterance"),
            distance: Slot::new("obstacle_distance"),
        }
    }
}

impl Default for PerceptionState {
    fn default() -> Self {
        Self::new()
    }
}
