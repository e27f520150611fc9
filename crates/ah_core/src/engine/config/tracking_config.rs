//! World model ingest configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::engine::timestep::{FRAME_INTERVAL_US, STALE_FRAME_MULTIPLIER};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TrackingConfig {
    /// Expected interval between camera frames (µs)
    #[validate(range(min = 1000, max = 1_000_000))]
    pub frame_interval_us: u64,
    /// Missed frames tolerated before a body is marked stale
    #[validate(range(min = 1, max = 100))]
    pub stale_multiplier: u32,
    /// Weight of the newest finite-difference sample in the velocity EMA
    #[validate(range(min = 0.01, max = 1.0))]
    pub velocity_ema_alpha: f32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            frame_interval_us: FRAME_INTERVAL_US,
            stale_multiplier: STALE_FRAME_MULTIPLIER,
            velocity_ema_alpha: 0.5,
        }
    }
}

impl TrackingConfig {
    pub fn stale_timeout_us(&self) -> u64 {
        self.frame_interval_us * self.stale_multiplier as u64
    }
}
