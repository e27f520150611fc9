//! Mechanical motion limits shared by the planner and every controller.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::physics_constants::mechanical;

/// Speed/acceleration envelope of the controlled mallet.
///
/// The planner times its waypoints with these limits and the controllers
/// never report motion that exceeds them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MotionLimits {
    #[validate(range(min = 0.01, max = 20.0))]
    pub max_speed_mps: f32,
    #[validate(range(min = 0.1, max = 500.0))]
    pub max_accel_mps2: f32,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            max_speed_mps: mechanical::MAX_SPEED_MPS,
            max_accel_mps2: mechanical::MAX_ACCEL_MPS2,
        }
    }
}

impl MotionLimits {
    /// Same acceleration, speed cap scaled by `fraction` (clamped to (0, 1]).
    pub fn with_speed_fraction(&self, fraction: f32) -> Self {
        let fraction = fraction.clamp(0.01, 1.0);
        Self { max_speed_mps: self.max_speed_mps * fraction, ..*self }
    }

    /// Rest-to-rest travel time over `distance` with a trapezoidal profile.
    ///
    /// Accelerate at `max_accel`, cruise at `max_speed`, brake at
    /// `max_accel`; short moves never reach cruise (triangular profile).
    pub fn travel_time(&self, distance: f32) -> f32 {
        if distance <= 0.0 {
            return 0.0;
        }
        let v = self.max_speed_mps;
        let a = self.max_accel_mps2;
        let ramp_distance = v * v / a;
        if distance >= ramp_distance {
            distance / v + v / a
        } else {
            2.0 * (distance / a).sqrt()
        }
    }
}
