//! Strategy layer
//!
//! A strategy turns a world snapshot into an [`Intent`]: where the
//! controlled mallet should go this tick and how urgently. The
//! [`StrategyEngine`] decides which strategy is active.
//!
//! ## Components
//!
//! - `Strategy` trait: shared contract of every variant
//! - Offense: `NaiveOffense`, `WaypointOffense`
//! - Defense: `NaiveDefense`, `TriangleDefense`, `RetreatingDefense`,
//!   `HybridDefense`, `HomePosition`
//! - `UserInputStrategy`: clamped passthrough of an input device
//! - `StrategyEngine`: offense/defense state machine with hysteresis

mod engine;
mod home_position;
mod hybrid_defense;
mod naive_defense;
mod naive_offense;
mod retreating_defense;
mod triangle_defense;
mod user_input;
mod waypoint_offense;

pub use engine::{Posture, StrategyDecision, StrategyEngine};
pub use home_position::HomePosition;
pub use hybrid_defense::HybridDefense;
pub use naive_defense::NaiveDefense;
pub use naive_offense::NaiveOffense;
pub use retreating_defense::RetreatingDefense;
pub use triangle_defense::TriangleDefense;
pub use user_input::UserInputStrategy;
pub use waypoint_offense::WaypointOffense;

use serde::{Deserialize, Serialize};

use super::config::{DefenseVariant, EngineConfig, MotionLimits, OffenseVariant, StrategyConfig};
use super::geometry::{Rect, Segment};
use super::puck_prediction::PuckPredictor;
use super::table::Table;
use super::types::Vec2;
use super::world_model::WorldSnapshot;

/// Gap kept between the defensive guard line and the goal-side wall (m)
pub(crate) const GOAL_LINE_MARGIN_M: f32 = 0.02;

/// Per-tick target for the planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub target: Vec2,
    /// 0 = leisurely, 1 = full speed
    pub urgency: f32,
}

impl Intent {
    pub fn new(target: Vec2, urgency: f32) -> Self {
        Self { target, urgency: urgency.clamp(0.0, 1.0) }
    }
}

/// External inputs for one tick besides the world snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    /// Latest input-device position, already in table coordinates
    pub user_sample: Option<Vec2>,
}

impl TickInput {
    pub fn with_user_sample(sample: Vec2) -> Self {
        Self { user_sample: Some(sample) }
    }
}

/// Shared contract of every strategy variant.
///
/// State carried across ticks is limited to the variant's own waypoint
/// progress; `init_strategy` resets it whenever the variant becomes active.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called when the strategy becomes active
    fn init_strategy(&mut self, world: &WorldSnapshot);

    fn compute_intent(&mut self, world: &WorldSnapshot, input: &TickInput) -> Intent;

    /// Lines for the render consumer (guard triangle, defence line, ...)
    fn guard_lines(&self) -> Vec<Segment> {
        Vec::new()
    }
}

/// Parameters every variant may read.
#[derive(Debug, Clone)]
pub struct StrategyParams {
    pub config: StrategyConfig,
    pub limits: MotionLimits,
    pub wall_restitution: f32,
}

impl StrategyParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            config: config.strategy.clone(),
            limits: config.limits,
            wall_restitution: config.physics.wall_restitution,
        }
    }

    pub fn predictor(&self, table: &Table) -> PuckPredictor {
        PuckPredictor::new(*table, self.config.prediction_max_bounces, self.wall_restitution)
    }

    pub fn home(&self, table: &Table) -> Vec2 {
        table.home_position(self.config.home_x_ratio)
    }

    /// x of the guard line just in front of the controlled goal.
    pub fn goal_guard_x(&self, world: &WorldSnapshot) -> f32 {
        world.table.width - world.own_mallet().body.radius - GOAL_LINE_MARGIN_M
    }
}

/// Frame the controlled mallet centre can occupy.
pub(crate) fn mallet_frame(world: &WorldSnapshot) -> Rect {
    world.table.collision_frame(world.own_mallet().body.radius)
}

pub fn build_offense(variant: OffenseVariant, params: &StrategyParams) -> Box<dyn Strategy> {
    match variant {
        OffenseVariant::NaiveOffense => Box::new(NaiveOffense::new(params.clone())),
        OffenseVariant::WaypointOffense => Box::new(WaypointOffense::new(params.clone())),
    }
}

pub fn build_defense(variant: DefenseVariant, params: &StrategyParams) -> Box<dyn Strategy> {
    match variant {
        DefenseVariant::NaiveDefense => Box::new(NaiveDefense::new(params.clone())),
        DefenseVariant::TriangleDefense => Box::new(TriangleDefense::new(params.clone())),
        DefenseVariant::RetreatingDefense => Box::new(RetreatingDefense::new(params.clone())),
        DefenseVariant::HybridDefense => Box::new(HybridDefense::new(params.clone())),
        DefenseVariant::HomePosition => Box::new(HomePosition::new(params.clone())),
    }
}
