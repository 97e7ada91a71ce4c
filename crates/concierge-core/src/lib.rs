//! # Concierge Core - approach and dialog coordination for a social robot
//!
//! Drives the interaction cycle: find a speaking user by sound direction, turn and
//! approach, hold a spoken dialog with an external dialog manager, then back off to the
//! starting pose.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  feeds (audio source / utterance / sonar)                    │
//! │     │ confidence threshold      │ echo filter                │
//! │     ↓                           ↓                            │
//! │  ┌────────────────────────────────────────────────┐          │
//! │  │ PerceptionState (bearing, utterance, distance) │          │
//! │  └────────────────────────────────────────────────┘          │
//! │     ↓ wait_for_change                                        │
//! │  ┌──────────────┐   ┌───────────────┐   ┌──────────────┐     │
//! │  │ ControlLoop  │ → │ DialogSession │ → │ DialogService│     │
//! │  └──────────────┘   └───────────────┘   └──────────────┘     │
//! │     ↓ move_by / speak (estimated-duration blocking)          │
//! │  ┌──────────────┐   ┌──────────────┐                         │
//! │  │   Actuator   │   │ Synthesizer  │ → SpeechWindow → echo   │
//! │  └──────────────┘   └──────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod actions;
pub mod actuation;
pub mod config;
pub mod control;
pub mod dialog;
pub mod duration;
pub mod echo;
pub mod error;
pub mod feeds;
pub mod perception;

pub use actions::ActionPrimitives;
pub use actuation::{
    Actuator, JsonLinesBridge, MotionCommand, PlaceholderBody, PoseCommand, Quaternion, Synthesizer,
};
pub use config::ConciergeConfig;
pub use control::{travel_distance, ControlLoop, CycleReport, LoopState};
pub use dialog::{
    contains_phrase, is_farewell, DialogOutcome, DialogPhase, DialogService, DialogSession,
    DialogState, HttpDialogService,
};
pub use duration::{motion_duration, utterance_duration};
pub use echo::{Clock, EchoFilter, SpeechWindow, SpeechWindowPublisher, SystemClock};
pub use error::{ConciergeError, ConciergeResult};
pub use feeds::{AudioSourceReading, PerceptionEvent, PerceptionFeeds, RangeReading};
pub use perception::{PerceptionState, Slot, Utterance};
