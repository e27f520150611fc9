//! Controllers: turn a planned trajectory into mallet motion.
//!
//! Three implementations share one capability trait and are selected when
//! the session is configured:
//!
//! - [`SimulatedRobotController`]: kinematic integration, ground truth for
//!   the next world update
//! - [`RealRobotController`]: next reachable waypoint to a physical
//!   actuator over an [`ActuatorChannel`]
//! - [`UserController`]: a human moves the mallet; only its state is reported
//!
//! Every implementation reports positions through
//! [`steering::limited_step`](super::steering::limited_step), so consecutive
//! reports never exceed the motion limits the planner assumed. The user
//! controller additionally stops at the rails of the mallet frame.

mod real;
mod serial;
mod simulated;
mod user;

pub use real::{ActuatorChannel, RealRobotController};
pub use serial::{LoopbackChannel, LoopbackFault, SerialCodec};
pub use simulated::SimulatedRobotController;
pub use user::{UserController, UserInputHandle};

use serde::{Deserialize, Serialize};

use super::config::EngineConfig;
use super::trajectory::Trajectory;
use super::types::Vec2;
use crate::error::ActuatorError;

/// Kinematic state of the controlled mallet as reported by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MalletState {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl MalletState {
    pub fn at_rest(position: Vec2) -> Self {
        Self { position, velocity: Vec2::zeros() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    Real,
    Simulated,
    UserInput,
}

/// Capability shared by all controllers.
///
/// Lifecycle: created at session start, `initialize` before the first
/// tick, `shutdown` at session end (releases any hardware handle).
pub trait Controller: Send {
    fn kind(&self) -> ControllerKind;

    fn initialize(&mut self, start: MalletState) -> Result<(), ActuatorError>;

    /// Execute `dt` seconds of `trajectory` and return the resulting state.
    fn apply(&mut self, trajectory: &Trajectory, dt: f32) -> Result<MalletState, ActuatorError>;

    fn report_state(&self) -> MalletState;

    fn shutdown(&mut self);
}

/// Where the mallet should head this tick.
pub(crate) fn next_target(trajectory: &Trajectory) -> Vec2 {
    trajectory.next_waypoint().map_or(trajectory.start(), |w| w.position)
}

/// Session-time controller selection
pub enum ControllerSetup {
    Simulated,
    UserInput(UserInputHandle),
    Real(Box<dyn ActuatorChannel>, SerialCodec),
}

impl ControllerSetup {
    pub fn kind(&self) -> ControllerKind {
        match self {
            ControllerSetup::Simulated => ControllerKind::Simulated,
            ControllerSetup::UserInput(_) => ControllerKind::UserInput,
            ControllerSetup::Real(..) => ControllerKind::Real,
        }
    }
}

/// Build the selected controller with the motion limits and mallet frame of
/// `config`.
pub fn build_controller(setup: ControllerSetup, config: &EngineConfig) -> Box<dyn Controller> {
    let limits = config.limits;
    match setup {
        ControllerSetup::Simulated => Box::new(SimulatedRobotController::new(limits)),
        ControllerSetup::UserInput(handle) => {
            let frame = config.table_geometry().collision_frame(config.physics.mallet_radius_m);
            Box::new(UserController::new(handle, limits, frame))
        }
        ControllerSetup::Real(channel, codec) => {
            Box::new(RealRobotController::new(channel, codec, limits))
        }
    }
}
