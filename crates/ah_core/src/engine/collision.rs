//! Collision model for circular bodies on the table.
//!
//! All queries are pure functions of two `MovingBody` values (or a body and
//! the table) assuming straight-line motion. Times are in seconds from the
//! bodies' current state.

use serde::{Deserialize, Serialize};

use super::geometry::{normalize_or_zero, GEOMETRY_EPSILON};
use super::table::Table;
use super::types::{MovingBody, Vec2};

/// Table boundary hit by a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wall {
    /// `x = 0` (opponent goal line)
    Left,
    /// `x = width` (controlled goal line)
    Right,
    /// `y = height`
    Top,
    /// `y = 0`
    Bottom,
}

impl Wall {
    /// Unit normal pointing back into the table.
    pub fn inward_normal(self) -> Vec2 {
        match self {
            Wall::Left => Vec2::new(1.0, 0.0),
            Wall::Right => Vec2::new(-1.0, 0.0),
            Wall::Top => Vec2::new(0.0, -1.0),
            Wall::Bottom => Vec2::new(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallHit {
    pub time: f32,
    pub wall: Wall,
}

/// Earliest time at which the two circles touch.
///
/// Solves `|d + w·t| = ra + rb` with `d = pb - pa`, `w = vb - va`.
/// Returns `None` when the bodies are not closing: no relative motion, a
/// negative discriminant, or touching/overlapping bodies moving apart.
/// Overlapping bodies that are still closing return `Some(0.0)`.
pub fn time_to_collision(a: &MovingBody, b: &MovingBody) -> Option<f32> {
    let d = b.position - a.position;
    let w = b.velocity - a.velocity;
    let r = a.radius + b.radius;

    let closing = d.dot(&w);
    if closing >= 0.0 {
        // Separating or sliding past: includes exactly touching and moving apart
        return None;
    }
    let qa = w.norm_squared();
    if qa < GEOMETRY_EPSILON * GEOMETRY_EPSILON {
        return None;
    }
    let qc = d.norm_squared() - r * r;
    if qc <= 0.0 {
        return Some(0.0);
    }
    let qb = 2.0 * closing;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }
    // Smaller root (-qb - √disc) / 2qa, rewritten to avoid cancellation near contact
    let t = 2.0 * qc / (-qb + disc.sqrt());
    (t.is_finite() && t >= 0.0).then_some(t)
}

/// Whether the circles currently touch or overlap.
pub fn is_colliding(a: &MovingBody, b: &MovingBody) -> bool {
    let r = a.radius + b.radius;
    (b.position - a.position).norm_squared() <= r * r
}

/// Whether a contact is predicted within `horizon` seconds.
pub fn will_collide_within(a: &MovingBody, b: &MovingBody, horizon: f32) -> bool {
    time_to_collision(a, b).is_some_and(|t| t <= horizon)
}

/// Earliest time at which the circle's leading edge reaches a boundary.
///
/// Each axis is solved independently and the minimum is taken. A body
/// already past a boundary and still moving outward reports time zero.
pub fn time_to_wall_collision(body: &MovingBody, table: &Table) -> Option<WallHit> {
    let frame = table.collision_frame(body.radius);
    let p = body.position;
    let v = body.velocity;

    let axis_hit = |pos: f32, vel: f32, lo: f32, hi: f32, low_wall: Wall, high_wall: Wall| {
        if vel > GEOMETRY_EPSILON {
            Some(WallHit { time: ((hi - pos) / vel).max(0.0), wall: high_wall })
        } else if vel < -GEOMETRY_EPSILON {
            Some(WallHit { time: ((lo - pos) / vel).max(0.0), wall: low_wall })
        } else {
            None
        }
    };

    let hx = axis_hit(p.x, v.x, frame.min.x, frame.max.x, Wall::Left, Wall::Right);
    let hy = axis_hit(p.y, v.y, frame.min.y, frame.max.y, Wall::Bottom, Wall::Top);

    match (hx, hy) {
        (Some(x), Some(y)) => Some(if y.time < x.time { y } else { x }),
        (x, y) => x.or(y),
    }
}

/// Post-collision velocities for a two-body elastic collision.
///
/// Momentum and kinetic energy are conserved; only the components along the
/// line of centres change. Bodies that are not approaching each other are
/// returned unchanged.
pub fn resolve_collision(a: &MovingBody, b: &MovingBody) -> (Vec2, Vec2) {
    let n = normalize_or_zero(b.position - a.position);
    if n == Vec2::zeros() {
        return (a.velocity, b.velocity);
    }
    let approach = (a.velocity - b.velocity).dot(&n);
    if approach <= 0.0 {
        return (a.velocity, b.velocity);
    }
    let total = a.mass + b.mass;
    if total <= 0.0 {
        return (a.velocity, b.velocity);
    }
    let va = a.velocity - n * (2.0 * b.mass / total * approach);
    let vb = b.velocity + n * (2.0 * a.mass / total * approach);
    (va, vb)
}

/// Puck velocity after a hit by a kinematically driven mallet.
///
/// The mallet is treated as infinitely massive: the relative normal speed is
/// reversed and scaled by `restitution`.
pub fn resolve_against_driven(puck: &MovingBody, mallet: &MovingBody, restitution: f32) -> Vec2 {
    let n = normalize_or_zero(puck.position - mallet.position);
    if n == Vec2::zeros() {
        return puck.velocity;
    }
    let rel = (puck.velocity - mallet.velocity).dot(&n);
    if rel >= 0.0 {
        return puck.velocity;
    }
    puck.velocity - n * ((1.0 + restitution) * rel)
}

/// Velocity after bouncing off `wall` with the given restitution.
pub fn reflect_off_wall(velocity: Vec2, wall: Wall, restitution: f32) -> Vec2 {
    let n = wall.inward_normal();
    let vn = velocity.dot(&n);
    if vn >= 0.0 {
        return velocity;
    }
    velocity - n * ((1.0 + restitution) * vn)
}
