//! Core value types shared by every component of the loop.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// 2D vector in table coordinates (metres, m/s).
pub type Vec2 = Vector2<f32>;

/// Identity of a tracked body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyId {
    Puck,
    /// The mallet driven by this system
    OwnMallet,
    OpponentMallet,
}

impl BodyId {
    pub const ALL: [BodyId; 3] = [BodyId::Puck, BodyId::OwnMallet, BodyId::OpponentMallet];

    /// Dense index for fixed-size per-body storage.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            BodyId::Puck => 0,
            BodyId::OwnMallet => 1,
            BodyId::OpponentMallet => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BodyId::Puck => "puck",
            BodyId::OwnMallet => "own_mallet",
            BodyId::OpponentMallet => "opponent_mallet",
        }
    }

    pub fn is_mallet(self) -> bool {
        !matches!(self, BodyId::Puck)
    }
}

/// A circular body moving on the table.
///
/// Invariant: `radius > 0`. The position lies within the table rectangle
/// unless `out_of_bounds` is set (e.g. a puck observed inside the goal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingBody {
    pub id: BodyId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub mass: f32,
    /// Time of the observation this state was derived from (µs)
    pub timestamp_us: u64,
    pub out_of_bounds: bool,
}

impl MovingBody {
    pub fn new(id: BodyId, position: Vec2, radius: f32, mass: f32) -> Self {
        debug_assert!(radius > 0.0, "body radius must be positive");
        Self {
            id,
            position,
            velocity: Vec2::zeros(),
            radius,
            mass,
            timestamp_us: 0,
            out_of_bounds: false,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn speed(&self) -> f32 {
        self.velocity.norm()
    }

    /// Position after `dt` seconds of straight-line motion.
    #[inline]
    pub fn projected_position(&self, dt: f32) -> Vec2 {
        self.position + self.velocity * dt
    }

    /// Copy of this body moved forward by `dt` seconds.
    pub fn advanced(&self, dt: f32) -> Self {
        Self { position: self.projected_position(dt), ..*self }
    }
}

/// One tracking sample from the vision pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub body: BodyId,
    pub position: Vec2,
    /// Tracker-supplied velocity; estimated from positions when absent
    pub velocity: Option<Vec2>,
    pub timestamp_us: u64,
}

impl Observation {
    pub fn at(body: BodyId, position: Vec2, timestamp_us: u64) -> Self {
        Self { body, position, velocity: None, timestamp_us }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_indices_are_dense() {
        let mut seen = [false; 3];
        for id in BodyId::ALL {
            seen[id.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_projected_position() {
        let body = MovingBody::new(BodyId::Puck, Vec2::new(1.0, 0.5), 0.05, 0.05)
            .with_velocity(Vec2::new(2.0, -1.0));
        let p = body.projected_position(0.5);
        assert!((p.x - 2.0).abs() < 1e-6);
        assert!((p.y - 0.0).abs() < 1e-6);
        assert_eq!(body.advanced(0.5).position, p);
        assert_eq!(body.advanced(0.5).velocity, body.velocity);
    }
}
