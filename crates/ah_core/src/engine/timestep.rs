/// timestep.rs
/// Control-loop timing constants
///
/// The loop period is matched to the vision sensor: one strategy decision,
/// one plan and one actuation per camera frame.

/// Camera frame rate (frames per second)
pub const CAMERA_FPS: u32 = 60;

/// Camera frame interval (µs), rounded to the nearest microsecond
pub const FRAME_INTERVAL_US: u64 = 16_667;

/// Default tick duration (s)
pub const TICK_DT: f32 = 1.0 / CAMERA_FPS as f32;

/// A body is stale after this many missed frames
pub const STALE_FRAME_MULTIPLIER: u32 = 3;

// Compile-time validation
const _: () = assert!(FRAME_INTERVAL_US * CAMERA_FPS as u64 / 1000 == 1000);

/// Microseconds → seconds
#[inline]
pub fn us_to_secs(us: u64) -> f32 {
    (us as f64 / 1_000_000.0) as f32
}

/// Seconds → microseconds (negative input saturates to 0)
#[inline]
pub fn secs_to_us(secs: f32) -> u64 {
    if secs <= 0.0 {
        0
    } else {
        (secs as f64 * 1_000_000.0).round() as u64
    }
}
