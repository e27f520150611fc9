//! Small planar geometry helpers on top of nalgebra vectors.
//!
//! nalgebra covers vector arithmetic; segment/rectangle queries used by the
//! collision model and the planner live here.

use serde::{Deserialize, Serialize};

use super::types::Vec2;

/// Lengths below this are treated as zero
pub const GEOMETRY_EPSILON: f32 = 1e-6;

/// Slack for containment checks against accumulated float error (m)
pub const CONTAINS_TOLERANCE: f32 = 1e-5;

/// Unit vector, or zero for degenerate input.
#[inline]
pub fn normalize_or_zero(v: Vec2) -> Vec2 {
    let len = v.norm();
    if len < GEOMETRY_EPSILON {
        Vec2::zeros()
    } else {
        v / len
    }
}

/// Counter-clockwise perpendicular.
#[inline]
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

/// z component of the 3D cross product.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Axis-aligned rectangle, inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn is_empty(&self) -> bool {
        self.width() < 0.0 || self.height() < 0.0
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x - CONTAINS_TOLERANCE
            && p.x <= self.max.x + CONTAINS_TOLERANCE
            && p.y >= self.min.y - CONTAINS_TOLERANCE
            && p.y <= self.max.y + CONTAINS_TOLERANCE
    }

    /// Nearest point inside the rectangle.
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.min.x, self.max.x), p.y.clamp(self.min.y, self.max.y))
    }

    /// Copy with the minimum x raised (used for half-table envelopes).
    pub fn with_min_x(&self, min_x: f32) -> Self {
        let min_x = min_x.min(self.max.x);
        Self { min: Vec2::new(min_x.max(self.min.x), self.min.y), max: self.max }
    }
}

/// Directed line segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

impl Segment {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f32 {
        (self.end - self.start).norm()
    }

    pub fn direction(&self) -> Vec2 {
        normalize_or_zero(self.end - self.start)
    }

    /// Point at parameter `t ∈ [0, 1]`.
    pub fn point_at(&self, t: f32) -> Vec2 {
        self.start + (self.end - self.start) * t
    }

    /// Parameter of the closest point to `p`, clamped to the segment.
    pub fn closest_param(&self, p: Vec2) -> f32 {
        let d = self.end - self.start;
        let len2 = d.norm_squared();
        if len2 < GEOMETRY_EPSILON * GEOMETRY_EPSILON {
            return 0.0;
        }
        ((p - self.start).dot(&d) / len2).clamp(0.0, 1.0)
    }

    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        self.point_at(self.closest_param(p))
    }

    pub fn distance_to(&self, p: Vec2) -> f32 {
        (p - self.closest_point(p)).norm()
    }

    /// Intersection point of two segments, `None` when parallel or disjoint.
    pub fn intersection(&self, other: &Segment) -> Option<Vec2> {
        let r = self.end - self.start;
        let s = other.end - other.start;
        let denom = cross(r, s);
        if denom.abs() < GEOMETRY_EPSILON {
            return None;
        }
        let qp = other.start - self.start;
        let t = cross(qp, s) / denom;
        let u = cross(qp, r) / denom;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(self.point_at(t))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_degenerate() {
        assert_eq!(normalize_or_zero(Vec2::zeros()), Vec2::zeros());
        let n = normalize_or_zero(Vec2::new(3.0, 4.0));
        assert!((n.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rect_clamp_and_contains() {
        let r = Rect::new(Vec2::new(0.1, 0.1), Vec2::new(1.0, 0.5));
        let c = r.clamp(Vec2::new(2.0, -1.0));
        assert_eq!(c, Vec2::new(1.0, 0.1));
        assert!(r.contains(c));
        assert!(!r.contains(Vec2::new(1.1, 0.2)));
    }

    #[test]
    fn test_rect_with_min_x_never_inverts() {
        let r = Rect::new(Vec2::new(0.1, 0.1), Vec2::new(1.0, 0.5));
        assert_eq!(r.with_min_x(0.6).min.x, 0.6);
        assert_eq!(r.with_min_x(5.0).min.x, 1.0);
        assert_eq!(r.with_min_x(-1.0).min.x, 0.1);
    }

    #[test]
    fn test_segment_intersection() {
        let a = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 2.0));
        let b = Segment::new(Vec2::new(0.0, 2.0), Vec2::new(2.0, 0.0));
        let p = a.intersection(&b).unwrap();
        assert!((p - Vec2::new(1.0, 1.0)).norm() < 1e-6);

        let c = Segment::new(Vec2::new(3.0, 0.0), Vec2::new(3.0, 1.0));
        assert!(a.intersection(&c).is_none());
    }

    #[test]
    fn test_segment_distance() {
        let s = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0));
        assert!((s.distance_to(Vec2::new(0.5, 0.3)) - 0.3).abs() < 1e-6);
        assert!((s.distance_to(Vec2::new(2.0, 0.0)) - 1.0).abs() < 1e-6);
    }
}
