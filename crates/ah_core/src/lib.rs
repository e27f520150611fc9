//! # ah_core - Autonomous Air Hockey Decision Loop
//!
//! This library drives a mallet (physical or simulated) against a human or
//! scripted opponent. One control-loop tick turns the latest tracking
//! observations into an actuation command:
//!
//! ```text
//! tracking input → WorldModel → StrategyEngine → PathPlanner → Controller
//!                      ▲                                          │
//!                      └──────────── own mallet feedback ─────────┘
//! ```
//!
//! ## Features
//! - Lock-guarded world model with staleness tracking and smoothed velocities
//! - Closed-form circle/circle and circle/wall collision timing
//! - Bounded-depth path planner (at most 3 waypoints) with opponent evasion
//! - Offense/defense state machine with hysteresis
//! - Real, simulated and user-input controllers behind one trait
//! - Fixed-period loop with deadline-miss accounting and clean teardown

// Geometry-heavy APIs take several scalar/vector parameters
#![allow(clippy::too_many_arguments)]
// Struct initialization pattern used intentionally in presets
#![allow(clippy::field_reassign_with_default)]

pub mod engine;
pub mod error;

pub use engine::config::EngineConfig;
pub use engine::control_loop::{ControlLoop, LoopStats, StopHandle, TickReport};
pub use engine::controller::{
    build_controller, ActuatorChannel, Controller, ControllerKind, ControllerSetup, LoopbackChannel,
    MalletState, RealRobotController, SerialCodec, SimulatedRobotController, UserController,
    UserInputHandle,
};
pub use engine::path_planner::{PathPlanner, Plan, PlanKind};
pub use engine::puck_simulation::{Score, SimulationConfig, TableSimulation};
pub use engine::strategy::{Intent, Posture, Strategy, StrategyEngine, TickInput};
pub use engine::table::Table;
pub use engine::telemetry::{JsonLinesSink, NullSink, TelemetryFrame, TelemetrySink};
pub use engine::trajectory::{Trajectory, Waypoint};
pub use engine::types::{BodyId, MovingBody, Observation, Vec2};
pub use engine::world_model::{WorldModel, WorldSnapshot};
pub use error::{ActuatorError, CoreError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
