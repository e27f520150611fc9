//! Path planner tuning.

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PlannerConfig {
    /// Extra clearance beyond the radius sum when evading the opponent (m)
    #[validate(range(min = 0.0, max = 0.5))]
    pub safety_epsilon_m: f32,
    /// Only collisions predicted within this window trigger evasion (s)
    #[validate(range(min = 0.0, max = 5.0))]
    pub collision_lookahead_s: f32,
    /// Evasion candidates whose path lengths differ by less than this are tied (m)
    #[validate(range(min = 0.0, max = 1.0))]
    pub tie_tolerance_m: f32,
    /// Cap on the perpendicular evasion offset (m)
    #[validate(range(min = 0.01, max = 5.0))]
    pub max_evasion_offset_m: f32,
    /// Keep the mallet on the controlled half of the table
    pub own_half_only: bool,
    /// Distance the mallet centre keeps behind the midline, on top of its radius (m)
    #[validate(range(min = 0.0, max = 1.0))]
    pub midline_margin_m: f32,
    /// Lower bound on the urgency-scaled cruise speed, as a fraction of max speed
    #[validate(range(min = 0.01, max = 1.0))]
    pub min_speed_fraction: f32,
    /// Safety epsilon multiplier when the opponent position is stale
    #[validate(range(min = 1.0, max = 10.0))]
    pub stale_margin_scale: f32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            safety_epsilon_m: 0.02,
            collision_lookahead_s: 0.5,
            tie_tolerance_m: 0.01,
            max_evasion_offset_m: 0.6,
            own_half_only: true,
            midline_margin_m: 0.0,
            min_speed_fraction: 0.3,
            stale_margin_scale: 1.5,
        }
    }
}
