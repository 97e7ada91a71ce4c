//! Action primitives: dispatch one command, then block for its estimated duration.
//!
//! Estimated-duration blocking stands in for completion callbacks the collaborators do not
//! provide. A call returns once the estimate elapses whether or not the robot is done.

use crate::actuation::{Actuator, MotionCommand, Synthesizer, DEFAULT_FRAME_ID};
use crate::duration::{motion_duration, utterance_duration};
use crate::echo::{Clock, SpeechWindow, SpeechWindowPublisher};
use crate::error::{ConciergeError, ConciergeResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

fn pacing(secs: f64) -> ConciergeResult<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConciergeError::DurationOutOfRange(secs))
}

/// Motion and speech for the control loop and the dialog session.
pub struct ActionPrimitives {
    actuator: Arc<dyn Actuator>,
    synthesizer: Arc<dyn Synthesizer>,
    speech_windows: Arc<SpeechWindowPublisher>,
    clock: Arc<dyn Clock>,
    frame_id: String,
}

impl ActionPrimitives {
    pub fn new(
        actuator: Arc<dyn Actuator>,
        synthesizer: Arc<dyn Synthesizer>,
        speech_windows: Arc<SpeechWindowPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            actuator,
            synthesizer,
            speech_windows,
            clock,
            frame_id: DEFAULT_FRAME_ID.to_string(),
        }
    }

    /// Frame the pose goals are expressed in (default `base_footprint`).
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }

    /// Send a single relative goal and wait `motion_duration` seconds.
    pub async fn move_by(&self, command: MotionCommand) -> ConciergeResult<()> {
        let secs = motion_duration(command.dx, command.dy, command.rotation_degrees);
        let pause = pacing(secs)?;
        let pose = command.to_pose(&self.frame_id);
        self.actuator.dispatch(&pose)?;

        if command.dx != 0.0 {
            info!(target: "concierge::actions", dx = command.dx, "x-axis move");
        }
        if command.dy != 0.0 {
            info!(target: "concierge::actions", dy = command.dy, "y-axis move");
        }
        if command.rotation_degrees != 0.0 {
            info!(target: "concierge::actions", degrees = command.rotation_degrees, "rotation");
        }

        tokio::time::sleep(pause).await;
        debug!(target: "concierge::actions", secs, "move is done");
        Ok(())
    }

    /// Say `utterance` and wait for its estimated playback time.
    ///
    /// The speech window is published before dispatch so recognition results produced
    /// during playback are already filterable.
    pub async fn speak(&self, utterance: &str) -> ConciergeResult<()> {
        let secs = utterance_duration(utterance);
        let pause = pacing(secs)?;
        let start = self.clock.now();
        self.speech_windows.publish(SpeechWindow::new(start, start + secs));

        self.synthesizer.say(utterance)?;
        info!(target: "concierge::actions", utterance, "say");

        tokio::time::sleep(pause).await;
        debug!(target: "concierge::actions", secs, "speech is done");
        Ok(())
    }
}
