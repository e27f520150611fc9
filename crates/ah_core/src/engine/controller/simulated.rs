use tracing::debug;

use super::{next_target, Controller, ControllerKind, MalletState};
use crate::engine::config::MotionLimits;
use crate::engine::steering::{check_step_contract, limited_step};
use crate::engine::trajectory::Trajectory;
use crate::engine::types::Vec2;
use crate::error::ActuatorError;

/// Integrates the mallet forward with the planner's motion limits.
#[derive(Debug, Clone)]
pub struct SimulatedRobotController {
    limits: MotionLimits,
    state: Option<MalletState>,
}

impl SimulatedRobotController {
    pub fn new(limits: MotionLimits) -> Self {
        Self { limits, state: None }
    }
}

impl Controller for SimulatedRobotController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Simulated
    }

    fn initialize(&mut self, start: MalletState) -> Result<(), ActuatorError> {
        debug!(x = start.position.x, y = start.position.y, "Simulated mallet initialized");
        self.state = Some(start);
        Ok(())
    }

    fn apply(&mut self, trajectory: &Trajectory, dt: f32) -> Result<MalletState, ActuatorError> {
        let prev = self.state.ok_or(ActuatorError::NotInitialized)?;
        let next = limited_step(&prev, next_target(trajectory), &self.limits, dt);
        check_step_contract(&prev, &next, &self.limits, dt);
        self.state = Some(next);
        Ok(next)
    }

    fn report_state(&self) -> MalletState {
        self.state.unwrap_or_else(|| MalletState::at_rest(Vec2::zeros()))
    }

    fn shutdown(&mut self) {
        self.state = None;
    }
}
