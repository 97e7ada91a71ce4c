//! **Collaborator seams**: motion and speech commands leave the core through the
//! `Actuator` and `Synthesizer` traits.
//!
//! Both collaborators are fire-and-forget: nothing acknowledges completion, which is why
//! `actions` paces itself with duration estimates.

use crate::error::{ConciergeError, ConciergeResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;
use tracing::info;

/// Reference frame of relative goals sent to the base.
pub const DEFAULT_FRAME_ID: &str = "base_footprint";

/// Relative displacement: forward/lateral meters and rotation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    #[serde(default)]
    pub dx: f64,
    #[serde(default)]
    pub dy: f64,
    #[serde(default)]
    pub rotation_degrees: f64,
}

impl MotionCommand {
    pub fn forward(dx: f64) -> Self {
        Self {
            dx,
            ..Default::default()
        }
    }

    pub fn rotate(rotation_degrees: f64) -> Self {
        Self {
            rotation_degrees,
            ..Default::default()
        }
    }

    /// Encode as a pose goal in `frame_id`.
    pub fn to_pose(&self, frame_id: &str) -> PoseCommand {
        PoseCommand {
            frame_id: frame_id.to_string(),
            position: Position {
                x: self.dx,
                y: self.dy,
                z: 0.0,
            },
            orientation: Quaternion::from_yaw_degrees(self.rotation_degrees),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Rotation about the vertical axis only (roll = pitch = 0).
    pub fn from_yaw_degrees(degrees: f64) -> Self {
        let half = degrees.to_radians() / 2.0;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }
}

/// Pose goal in the form the base controller accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseCommand {
    pub frame_id: String,
    pub position: Position,
    pub orientation: Quaternion,
}

/// Executes pose goals. Implementations must not wait for the motion to finish.
pub trait Actuator: Send + Sync {
    fn dispatch(&self, command: &PoseCommand) -> ConciergeResult<()>;
}

/// Renders an utterance audibly. Implementations must not wait for playback to finish.
pub trait Synthesizer: Send + Sync {
    fn say(&self, utterance: &str) -> ConciergeResult<()>;
}

/// Placeholder collaborator: logs commands and does nothing else. Useful for dry runs.
#[derive(Debug, Default)]
pub struct PlaceholderBody;

impl Actuator for PlaceholderBody {
    fn dispatch(&self, command: &PoseCommand) -> ConciergeResult<()> {
        info!(target: "concierge::actuation", ?command, "placeholder actuator: goal dropped");
        Ok(())
    }
}

impl Synthesizer for PlaceholderBody {
    fn say(&self, utterance: &str) -> ConciergeResult<()> {
        info!(target: "concierge::actuation", utterance, "placeholder synthesizer: speech dropped");
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum BridgeLine<'a> {
    Goal { goal: &'a PoseCommand },
    Speech { speech: &'a str },
}

/// Writes goals and utterances as one JSON object per line, e.g. to stdout for a bridge
/// process that owns the real drivers.
pub struct JsonLinesBridge<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesBridge<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the writer (tests inspect what was written).
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_line(
        &self,
        line: &BridgeLine<'_>,
        poisoned: fn(String) -> ConciergeError,
    ) -> ConciergeResult<()> {
        let encoded = serde_json::to_string(line)?;
        let mut out = self
            .out
            .lock()
            .map_err(|e| poisoned(format!("bridge writer poisoned: {}", e)))?;
        writeln!(out, "{}", encoded)?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Actuator for JsonLinesBridge<W> {
    fn dispatch(&self, command: &PoseCommand) -> ConciergeResult<()> {
        self.write_line(&BridgeLine::Goal { goal: command }, ConciergeError::Actuation)
    }
}

impl<W: Write + Send> Synthesizer for JsonLinesBridge<W> {
    fn say(&self, utterance: &str) -> ConciergeResult<()> {
        self.write_line(&BridgeLine::Speech { speech: utterance }, ConciergeError::Synthesis)
    }
}
