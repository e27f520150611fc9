//! Strategy selection and per-variant tuning.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::physics_constants::mallet;

/// Who chooses the target each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlMode {
    /// Offense/defense state machine
    Autonomous,
    /// Raw input-device coordinates, clamped to the table
    UserControlled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffenseVariant {
    NaiveOffense,
    WaypointOffense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseVariant {
    NaiveDefense,
    TriangleDefense,
    RetreatingDefense,
    HybridDefense,
    HomePosition,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StrategyConfig {
    pub mode: ControlMode,
    pub offense: OffenseVariant,
    pub defense: DefenseVariant,

    // ========== Posture selection ==========
    /// A projected goal entry within this window forces Defense (s)
    #[validate(range(min = 0.05, max = 10.0))]
    pub threat_horizon_s: f32,
    /// Minimum time between two non-forced posture switches (s)
    #[validate(range(min = 0.0, max = 10.0))]
    pub min_dwell_s: f32,
    /// Half-width of the no-decision band around the midline (m)
    #[validate(range(min = 0.0, max = 1.0))]
    pub midline_band_m: f32,
    /// Offense requires reaching the puck this much earlier than the opponent (s)
    #[validate(range(min = 0.0, max = 5.0))]
    pub interception_margin_s: f32,
    /// Assumed opponent mallet speed for interception races (m/s)
    #[validate(range(min = 0.1, max = 20.0))]
    pub opponent_speed_mps: f32,
    /// Wall bounces followed by the puck projection
    #[validate(range(min = 0, max = 16))]
    pub prediction_max_bounces: u32,

    // ========== Geometry of the variants ==========
    /// Home x as a fraction of the table width
    #[validate(range(min = 0.5, max = 1.0))]
    pub home_x_ratio: f32,
    /// Half-span of the triangle base as a fraction of the goal width
    #[validate(range(min = 0.1, max = 2.0))]
    pub guard_span_ratio: f32,
    /// A waypoint counts as reached within this distance (m)
    #[validate(range(min = 0.001, max = 0.5))]
    pub waypoint_switch_distance_m: f32,
    /// Gap between mallet and puck at the approach waypoint (m)
    #[validate(range(min = 0.0, max = 0.5))]
    pub approach_gap_m: f32,
    /// Distance the strike waypoint lies past the puck centre (m)
    #[validate(range(min = 0.0, max = 1.0))]
    pub strike_through_m: f32,
    /// Re-plan the offense waypoints when the puck moved this far (m)
    #[validate(range(min = 0.001, max = 1.0))]
    pub replan_distance_m: f32,
    /// Naive offense aims this fraction of the mallet→puck offset past the puck
    #[validate(range(min = 0.0, max = 2.0))]
    pub shoot_through_ratio: f32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            mode: ControlMode::Autonomous,
            offense: OffenseVariant::WaypointOffense,
            defense: DefenseVariant::TriangleDefense,
            threat_horizon_s: 1.0,
            min_dwell_s: 0.25,
            midline_band_m: 0.05,
            interception_margin_s: 0.1,
            opponent_speed_mps: 3.0,
            prediction_max_bounces: 4,
            home_x_ratio: mallet::HOME_X_RATIO,
            guard_span_ratio: 2.0 / 3.0,
            waypoint_switch_distance_m: 0.03,
            approach_gap_m: 0.03,
            strike_through_m: 0.15,
            replan_distance_m: 0.05,
            shoot_through_ratio: 0.1,
        }
    }
}
