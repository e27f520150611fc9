//! Table geometry and piece physics configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::physics_constants::{contact, mallet, puck, table};

/// Playing surface and goal geometry (metres)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TableConfig {
    #[validate(range(min = 0.1, max = 10.0))]
    pub width_m: f32,
    #[validate(range(min = 0.1, max = 10.0))]
    pub height_m: f32,
    #[validate(range(min = 0.01, max = 5.0))]
    pub goal_width_m: f32,
    #[validate(range(min = 0.0, max = 0.5))]
    pub goal_allowance_m: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            width_m: table::WIDTH_M,
            height_m: table::HEIGHT_M,
            goal_width_m: table::GOAL_WIDTH_M,
            goal_allowance_m: table::GOAL_ALLOWANCE_M,
        }
    }
}

/// Piece dimensions and contact model
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PhysicsConfig {
    #[validate(range(min = 0.005, max = 0.5))]
    pub puck_radius_m: f32,
    #[validate(range(min = 0.001, max = 10.0))]
    pub puck_mass_kg: f32,
    #[validate(range(min = 0.005, max = 0.5))]
    pub mallet_radius_m: f32,
    #[validate(range(min = 0.001, max = 10.0))]
    pub mallet_mass_kg: f32,
    /// Outgoing/incoming normal speed on wall contact
    #[validate(range(min = 0.0, max = 1.0))]
    pub wall_restitution: f32,
    /// Outgoing/incoming relative normal speed on mallet contact
    #[validate(range(min = 0.0, max = 1.0))]
    pub mallet_restitution: f32,
    /// Fraction of puck speed lost per second
    #[validate(range(min = 0.0, max = 1.0))]
    pub surface_friction_per_s: f32,
    #[validate(range(min = 0.1, max = 50.0))]
    pub max_puck_speed_mps: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            puck_radius_m: puck::RADIUS_M,
            puck_mass_kg: puck::MASS_KG,
            mallet_radius_m: mallet::RADIUS_M,
            mallet_mass_kg: mallet::MASS_KG,
            wall_restitution: contact::WALL_RESTITUTION,
            mallet_restitution: contact::MALLET_RESTITUTION,
            surface_friction_per_s: contact::SURFACE_FRICTION_PER_S,
            max_puck_speed_mps: puck::MAX_SPEED_MPS,
        }
    }
}
