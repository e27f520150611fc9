//! Kinematic limiter for the controlled mallet.
//!
//! Every controller reports positions through [`limited_step`], so the
//! sequence of reported states never exceeds the configured speed and
//! acceleration limits:
//!
//! ```text
//! |Δp / dt|        ≤ max_speed
//! |Δp / dt − v₀|   ≤ max_accel · dt
//! ```

use tracing::warn;

use super::config::MotionLimits;
use super::controller::MalletState;
use super::geometry::{normalize_or_zero, GEOMETRY_EPSILON};
use super::types::Vec2;

/// Relative slack on the limit checks
const LIMIT_TOLERANCE: f32 = 1e-3;

/// Position rounding absorbed by the limit checks (m)
const POSITION_SLACK_M: f32 = 1e-5;

/// Scale `v` down to at most `max_len`.
#[inline]
pub fn clamp_norm(v: Vec2, max_len: f32) -> Vec2 {
    let len = v.norm();
    if len > max_len && len > GEOMETRY_EPSILON {
        v * (max_len / len)
    } else {
        v
    }
}

/// Range of speeds `u ≥ 0` along `dir` reachable in one step.
///
/// The next velocity `u·dir` must stay inside the acceleration disc around
/// `v0` and the speed disc around the origin. `None` when the line misses
/// the acceleration disc entirely.
fn feasible_speed_range(v0: Vec2, dir: Vec2, limits: &MotionLimits, dt: f32) -> Option<(f32, f32)> {
    let reach = limits.max_accel_mps2 * dt;
    let p = dir.dot(&v0);
    let disc = p * p - v0.norm_squared() + reach * reach;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let lo = (p - root).max(0.0);
    let hi = (p + root).min(limits.max_speed_mps);
    (lo <= hi).then_some((lo, hi))
}

/// Advance `state` by `dt` toward `target` within `limits`.
///
/// Lands exactly on `target` when that is reachable; otherwise moves to the
/// furthest reachable point on the straight line to it. When no point on
/// that line is reachable (too fast, or sliding sideways) the mallet brakes
/// toward it as hard as the limits allow.
pub fn limited_step(state: &MalletState, target: Vec2, limits: &MotionLimits, dt: f32) -> MalletState {
    if dt <= 0.0 {
        return *state;
    }
    let v0 = clamp_norm(state.velocity, limits.max_speed_mps);
    let offset = target - state.position;
    let distance = offset.norm();
    let dir = normalize_or_zero(offset);

    let along_line = if dir == Vec2::zeros() {
        // Already there: staying put needs a full stop this step
        (v0.norm() <= limits.max_accel_mps2 * dt).then_some(0.0)
    } else {
        feasible_speed_range(v0, dir, limits, dt).and_then(|(lo, hi)| {
            let desired = distance / dt;
            (lo <= desired).then(|| desired.min(hi))
        })
    };

    let velocity = match along_line {
        Some(speed) => dir * speed,
        None => {
            let desired = offset / dt;
            let v = v0 + clamp_norm(desired - v0, limits.max_accel_mps2 * dt);
            clamp_norm(v, limits.max_speed_mps)
        }
    };
    let position = match along_line {
        Some(speed) if (speed * dt - distance).abs() < GEOMETRY_EPSILON => target,
        _ => state.position + velocity * dt,
    };
    MalletState { position, velocity }
}

/// Whether `next` follows `prev` within `limits` (with a small tolerance).
pub fn step_within_limits(prev: &MalletState, next: &MalletState, limits: &MotionLimits, dt: f32) -> bool {
    if dt <= 0.0 {
        return next.position == prev.position;
    }
    let v = (next.position - prev.position) / dt;
    let slack = POSITION_SLACK_M / dt;
    let speed_ok = v.norm() <= limits.max_speed_mps * (1.0 + LIMIT_TOLERANCE) + slack;
    let accel_ok = (v - clamp_norm(prev.velocity, limits.max_speed_mps)).norm()
        <= limits.max_accel_mps2 * dt * (1.0 + LIMIT_TOLERANCE) + slack;
    speed_ok && accel_ok
}

/// Report a reported state that breaks the limits. Panics with `strict_contracts`.
pub fn check_step_contract(prev: &MalletState, next: &MalletState, limits: &MotionLimits, dt: f32) -> bool {
    let ok = step_within_limits(prev, next, limits, dt);
    if !ok {
        if cfg!(feature = "strict_contracts") {
            panic!("mallet step exceeds motion limits: {:?} -> {:?}", prev, next);
        }
        warn!(
            from_x = prev.position.x,
            from_y = prev.position.y,
            to_x = next.position.x,
            to_y = next.position.y,
            "Mallet step exceeds motion limits"
        );
    }
    ok
}
