//! Physical constants for the air hockey table
//!
//! Default values for [`EngineConfig`](super::config::EngineConfig). Every
//! constant here can be overridden through configuration; code should read the
//! config, not these modules, except when building defaults.
//!
//! Coordinate convention (metres):
//!
//! ```text
//! (0,0) <---- x ----> (WIDTH, 0)
//!   ________________________
//!   |                      |
//! opponent goal      own goal
//!   |______________________|
//! (0, HEIGHT)        (WIDTH, HEIGHT)
//! ```

// ============================================================
// Table geometry
// ============================================================
pub mod table {
    /// Long side of the playing surface (m)
    pub const WIDTH_M: f32 = 2.5;
    /// Short side of the playing surface (m)
    pub const HEIGHT_M: f32 = 1.3;
    /// Goal mouth width (m)
    pub const GOAL_WIDTH_M: f32 = 0.3;
    /// Distance from the end wall at which a puck inside the goal mouth counts
    /// as scored (the puck never physically leaves the tracked area)
    pub const GOAL_ALLOWANCE_M: f32 = 0.015;
}

// ============================================================
// Pieces
// ============================================================
pub mod puck {
    pub const RADIUS_M: f32 = 0.05;
    pub const MASS_KG: f32 = 0.05;
    /// Hard cap on simulated puck speed (m/s)
    pub const MAX_SPEED_MPS: f32 = 8.0;
}

pub mod mallet {
    pub const RADIUS_M: f32 = 0.07;
    pub const MASS_KG: f32 = 0.2;
    /// Home x of the controlled mallet as a fraction of the table width
    pub const HOME_X_RATIO: f32 = 0.9;
    /// Start x of the opponent mallet as a fraction of the table width
    pub const OPPONENT_START_X_RATIO: f32 = 0.1;
}

// ============================================================
// Contact / surface model
// ============================================================
pub mod contact {
    /// Wall bounce: outgoing/incoming normal speed
    pub const WALL_RESTITUTION: f32 = 0.9;
    /// Mallet hit: outgoing/incoming relative normal speed
    pub const MALLET_RESTITUTION: f32 = 0.85;
    /// Fraction of puck speed lost per second to the air cushion
    pub const SURFACE_FRICTION_PER_S: f32 = 0.05;
}

// ============================================================
// Mechanical limits of the mallet gantry
// ============================================================
pub mod mechanical {
    pub const MAX_SPEED_MPS: f32 = 3.0;
    pub const MAX_ACCEL_MPS2: f32 = 30.0;
    /// Commands closer than this to the current position are not sent
    pub const POSITION_RESOLUTION_M: f32 = 0.001;
    /// Stepper resolution along each axis
    pub const STEPS_PER_METER_X: f32 = 4000.0;
    pub const STEPS_PER_METER_Y: f32 = 4000.0;
}
