//! Table geometry: bounds, goals and the per-radius collision frame.
//!
//! The controlled mallet defends the goal at `x = width`; the opponent
//! defends `x = 0`. Both goals are centred on `y = height / 2`.

use serde::{Deserialize, Serialize};

use super::config::TableConfig;
use super::geometry::{Rect, Segment};
use super::types::Vec2;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub width: f32,
    pub height: f32,
    pub goal_width: f32,
    /// A puck this close behind the goal line still counts as inside
    pub goal_allowance: f32,
}

impl Default for Table {
    fn default() -> Self {
        Self::from_config(&TableConfig::default())
    }
}

impl Table {
    pub fn from_config(cfg: &TableConfig) -> Self {
        Self {
            width: cfg.width_m,
            height: cfg.height_m,
            goal_width: cfg.goal_width_m,
            goal_allowance: cfg.goal_allowance_m,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let dims = [self.width, self.height, self.goal_width];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(CoreError::InvalidTableGeometry(format!(
                "dimensions must be positive and finite (width {}, height {}, goal {})",
                self.width, self.height, self.goal_width
            )));
        }
        if self.goal_width >= self.height {
            return Err(CoreError::InvalidTableGeometry(format!(
                "goal width {} must be smaller than table height {}",
                self.goal_width, self.height
            )));
        }
        if !self.goal_allowance.is_finite() || self.goal_allowance < 0.0 {
            return Err(CoreError::InvalidTableGeometry(format!(
                "goal allowance {} must be non-negative",
                self.goal_allowance
            )));
        }
        Ok(())
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(Vec2::zeros(), Vec2::new(self.width, self.height))
    }

    /// Region a circle centre of `radius` may occupy without leaving the table.
    pub fn collision_frame(&self, radius: f32) -> Rect {
        Rect::new(
            Vec2::new(radius, radius),
            Vec2::new(self.width - radius, self.height - radius),
        )
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn midline_x(&self) -> f32 {
        self.width / 2.0
    }

    /// `(low, high)` y extent of both goal mouths.
    pub fn goal_y_range(&self) -> (f32, f32) {
        let half = self.goal_width / 2.0;
        (self.height / 2.0 - half, self.height / 2.0 + half)
    }

    pub fn own_goal_center(&self) -> Vec2 {
        Vec2::new(self.width, self.height / 2.0)
    }

    pub fn opponent_goal_center(&self) -> Vec2 {
        Vec2::new(0.0, self.height / 2.0)
    }

    pub fn own_goal_mouth(&self) -> Segment {
        let (lo, hi) = self.goal_y_range();
        Segment::new(Vec2::new(self.width, lo), Vec2::new(self.width, hi))
    }

    pub fn opponent_goal_mouth(&self) -> Segment {
        let (lo, hi) = self.goal_y_range();
        Segment::new(Vec2::new(0.0, lo), Vec2::new(0.0, hi))
    }

    pub fn is_on_own_side(&self, p: Vec2) -> bool {
        p.x > self.midline_x()
    }

    pub fn is_in_goal_y(&self, y: f32) -> bool {
        let (lo, hi) = self.goal_y_range();
        y >= lo && y <= hi
    }

    /// Puck of `radius` centred at `p` has entered the controlled goal.
    pub fn is_in_own_goal(&self, p: Vec2, radius: f32) -> bool {
        p.x >= self.width - radius - self.goal_allowance && self.is_in_goal_y(p.y)
    }

    pub fn is_in_opponent_goal(&self, p: Vec2, radius: f32) -> bool {
        p.x <= radius + self.goal_allowance && self.is_in_goal_y(p.y)
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.bounds().contains(p)
    }

    /// Home position for a mallet defending `x = width`.
    pub fn home_position(&self, home_x_ratio: f32) -> Vec2 {
        Vec2::new(home_x_ratio * self.width, self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_valid() {
        let t = Table::default();
        t.validate().unwrap();
        assert!((t.width - 2.5).abs() < 1e-6);
        assert_eq!(t.own_goal_center(), Vec2::new(2.5, 0.65));
    }

    #[test]
    fn test_invalid_geometry() {
        let mut t = Table::default();
        t.width = 0.0;
        assert!(t.validate().is_err());

        let mut t = Table::default();
        t.height = f32::NAN;
        assert!(t.validate().is_err());

        let mut t = Table::default();
        t.goal_width = t.height;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_collision_frame_shrinks_by_radius() {
        let t = Table::default();
        let f = t.collision_frame(0.07);
        assert!((f.min.x - 0.07).abs() < 1e-6);
        assert!((f.max.y - (1.3 - 0.07)).abs() < 1e-6);
    }

    #[test]
    fn test_goal_detection() {
        let t = Table::default();
        assert!(t.is_in_own_goal(Vec2::new(2.46, 0.65), 0.05));
        assert!(!t.is_in_own_goal(Vec2::new(2.46, 0.2), 0.05));
        assert!(!t.is_in_own_goal(Vec2::new(2.0, 0.65), 0.05));
        assert!(t.is_in_opponent_goal(Vec2::new(0.04, 0.7), 0.05));
    }

    #[test]
    fn test_sides() {
        let t = Table::default();
        assert!(t.is_on_own_side(Vec2::new(2.0, 0.5)));
        assert!(!t.is_on_own_side(Vec2::new(1.25, 0.5)));
        assert_eq!(t.home_position(0.9), Vec2::new(2.25, 0.65));
    }
}
