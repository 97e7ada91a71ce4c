//! Main control loop: AwaitingUser → Approaching → InDialog → Retreating → AwaitingUser.
//!
//! The bearing and travel distance captured at the start of a cycle are reused unchanged
//! for the retreat, so perception updates that arrive mid-dialog cannot skew the return.

use crate::actions::ActionPrimitives;
use crate::actuation::MotionCommand;
use crate::config::{ConciergeConfig, DEFAULT_APOLOGY, DEFAULT_APPROACH_STANDOFF_M, DEFAULT_GREETING};
use crate::dialog::{DialogOutcome, DialogService, DialogSession};
use crate::error::ConciergeResult;
use crate::perception::PerceptionState;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUser,
    Approaching,
    InDialog,
    Retreating,
}

impl LoopState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopState::AwaitingUser => "awaiting_user",
            LoopState::Approaching => "approaching",
            LoopState::InDialog => "in_dialog",
            LoopState::Retreating => "retreating",
        }
    }
}

/// What one cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Rotation applied toward the user, degrees.
    pub bearing: f64,
    /// Forward travel toward the user, meters.
    pub travel: f64,
    /// `None` when the dialog service failed and the apology was spoken instead.
    pub dialog: Option<DialogOutcome>,
}

/// Forward travel that leaves `standoff` meters to the obstacle, never negative.
pub fn travel_distance(obstacle_distance: f64, standoff: f64) -> f64 {
    (obstacle_distance - standoff).max(0.0)
}

pub struct ControlLoop {
    perception: Arc<PerceptionState>,
    actions: ActionPrimitives,
    service: Arc<dyn DialogService>,
    standoff_m: f64,
    greeting: String,
    apology: String,
    state: LoopState,
}

impl ControlLoop {
    pub fn new(
        perception: Arc<PerceptionState>,
        actions: ActionPrimitives,
        service: Arc<dyn DialogService>,
    ) -> Self {
        Self {
            perception,
            actions,
            service,
            standoff_m: DEFAULT_APPROACH_STANDOFF_M,
            greeting: DEFAULT_GREETING.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
            state: LoopState::AwaitingUser,
        }
    }

    /// Build with the standoff, greeting and apology from `config`.
    pub fn from_config(
        config: &ConciergeConfig,
        perception: Arc<PerceptionState>,
        actions: ActionPrimitives,
        service: Arc<dyn DialogService>,
    ) -> Self {
        Self::new(perception, actions, service)
            .with_standoff(config.approach_standoff_m)
            .with_greeting(config.greeting.clone())
            .with_apology(config.apology.clone())
    }

    pub fn with_standoff(mut self, standoff_m: f64) -> Self {
        self.standoff_m = standoff_m;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_apology(mut self, apology: impl Into<String>) -> Self {
        self.apology = apology.into();
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    fn enter(&mut self, state: LoopState) {
        info!(target: "concierge::loop", from = self.state.as_str(), to = state.as_str(), "state");
        self.state = state;
    }

    /// Run one full interaction cycle.
    ///
    /// Dialog failures are absorbed: the apology is attempted and the retreat always
    /// runs. Motion dispatch failures propagate.
    pub async fn run_cycle(&mut self) -> ConciergeResult<CycleReport> {
        info!(target: "concierge::loop", "🔄 interaction cycle begins");
        self.enter(LoopState::AwaitingUser);
        let bearing = self.perception.bearing.wait_for_change().await?;

        self.enter(LoopState::Approaching);
        self.actions.move_by(MotionCommand::rotate(bearing)).await?;
        let distance = self.perception.distance.wait_for_change().await?;
        let travel = travel_distance(distance, self.standoff_m);
        info!(target: "concierge::loop", distance, travel, "moving forward to meet the user");
        self.actions.move_by(MotionCommand::forward(travel)).await?;

        self.enter(LoopState::InDialog);
        let session = DialogSession::new(
            &self.actions,
            &self.perception.utterance,
            self.service.as_ref(),
            self.greeting.clone(),
        );
        let dialog = match session.run().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(target: "concierge::loop", error = %e, "dialog failed; apologising");
                if let Err(e) = self.actions.speak(&self.apology).await {
                    warn!(target: "concierge::loop", error = %e, "apology could not be spoken");
                }
                None
            }
        };

        self.enter(LoopState::Retreating);
        self.actions.move_by(MotionCommand::forward(-travel)).await?;
        self.actions.move_by(MotionCommand::rotate(-bearing)).await?;

        self.enter(LoopState::AwaitingUser);
        info!(target: "concierge::loop", "✅ interaction cycle is done");
        Ok(CycleReport {
            bearing,
            travel,
            dialog,
        })
    }

    /// Cycle forever. Errors are logged and the next cycle starts from AwaitingUser.
    pub async fn run_forever(&mut self) {
        loop {
            match self.run_cycle().await {
                Ok(report) => info!(
                    target: "concierge::loop",
                    bearing = report.bearing,
                    travel = report.travel,
                    turns = report.dialog.as_ref().map(|d| d.turns).unwrap_or(0),
                    "cycle complete"
                ),
                Err(e) => {
                    error!(target: "concierge::loop", error = %e, "cycle aborted");
                    self.state = LoopState::AwaitingUser;
                }
            }
        }
    }
}
