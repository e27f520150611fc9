use serde::Serialize;

use super::{mallet_frame, Intent, Strategy, StrategyParams, TickInput};
use crate::engine::geometry::Segment;
use crate::engine::types::Vec2;
use crate::engine::world_model::WorldSnapshot;

/// Three guard points in front of the controlled goal.
///
/// The apex sits at the home position; the base points straddle the goal
/// mouth on the goal guard line. Any shot into the goal (straight or banked
/// off either wall) crosses one of the three edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuardTriangle {
    pub apex: Vec2,
    pub base_low: Vec2,
    pub base_high: Vec2,
}

impl GuardTriangle {
    pub fn for_world(world: &WorldSnapshot, params: &StrategyParams) -> Self {
        let table = &world.table;
        let frame = mallet_frame(world);
        let apex = params.home(table);
        let half_span = params.config.guard_span_ratio * table.goal_width;
        let guard_x = params.goal_guard_x(world).max(apex.x);
        let mid_y = table.height / 2.0;
        Self {
            apex: frame.clamp(apex),
            base_low: frame.clamp(Vec2::new(guard_x, mid_y - half_span)),
            base_high: frame.clamp(Vec2::new(guard_x, mid_y + half_span)),
        }
    }

    pub fn edges(&self) -> [Segment; 3] {
        [
            Segment::new(self.apex, self.base_low),
            Segment::new(self.apex, self.base_high),
            Segment::new(self.base_low, self.base_high),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct TriangleDefense {
    params: StrategyParams,
    guard: Option<GuardTriangle>,
}

impl TriangleDefense {
    pub fn new(params: StrategyParams) -> Self {
        Self { params, guard: None }
    }
}

impl Strategy for TriangleDefense {
    fn name(&self) -> &'static str {
        "triangle_defense"
    }

    fn init_strategy(&mut self, world: &WorldSnapshot) {
        self.guard = Some(GuardTriangle::for_world(world, &self.params));
    }

    fn compute_intent(&mut self, world: &WorldSnapshot, _input: &TickInput) -> Intent {
        let guard = *self.guard.get_or_insert_with(|| GuardTriangle::for_world(world, &self.params));
        let frame = mallet_frame(world);
        let puck = world.puck().predictive_body();
        let path = self
            .params
            .predictor(&world.table)
            .project(&puck, self.params.config.threat_horizon_s);

        let threatened = path.own_goal_entry().is_some() || puck.velocity.x > 0.0;
        if threatened {
            if let Some((point, _)) = path.first_intersection(&guard.edges()) {
                return Intent::new(frame.clamp(point), 1.0);
            }
            if let Some(entry) = path.own_goal_entry() {
                let y = entry.point.y.clamp(guard.base_low.y, guard.base_high.y);
                return Intent::new(frame.clamp(Vec2::new(guard.base_low.x, y)), 1.0);
            }
        }

        // Idle: shadow the puck along the front of the triangle
        let y = puck.position.y.clamp(guard.base_low.y, guard.base_high.y);
        Intent::new(frame.clamp(Vec2::new(guard.apex.x, y)), 0.6)
    }

    fn guard_lines(&self) -> Vec<Segment> {
        self.guard.map(|g| g.edges().to_vec()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{params, snapshot};
    use super::*;

    #[test]
    fn test_triangle_layout() {
        let world = snapshot(Vec2::new(1.0, 0.5), Vec2::zeros(), Vec2::new(2.2, 0.65), Vec2::new(0.3, 0.65));
        let g = GuardTriangle::for_world(&world, &params());
        assert!((g.apex.x - 2.25).abs() < 1e-5);
        assert!((g.base_low.x - (2.5 - 0.07 - 0.02)).abs() < 1e-5);
        assert!((g.base_high.y - g.base_low.y - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_straight_shot_meets_apex() {
        let world = snapshot(Vec2::new(1.25, 0.65), Vec2::new(2.0, 0.0), Vec2::new(2.3, 0.4), Vec2::new(0.3, 0.65));
        let mut s = TriangleDefense::new(params());
        s.init_strategy(&world);
        let intent = s.compute_intent(&world, &TickInput::default());
        assert!((intent.target - Vec2::new(2.25, 0.65)).norm() < 1e-4);
        assert_eq!(intent.urgency, 1.0);
        assert_eq!(s.guard_lines().len(), 3);
    }

    #[test]
    fn test_angled_shot_meets_an_edge() {
        // Aimed at the low post
        let world = snapshot(Vec2::new(1.25, 0.9), Vec2::new(2.0, -0.3), Vec2::new(2.3, 0.4), Vec2::new(0.3, 0.65));
        let mut s = TriangleDefense::new(params());
        let intent = s.compute_intent(&world, &TickInput::default());
        assert!(intent.target.x > 2.25 - 1e-4);
        assert!(intent.target.y < 0.9);
    }

    #[test]
    fn test_idle_shadows_puck() {
        let world = snapshot(Vec2::new(0.8, 0.2), Vec2::new(-1.0, 0.0), Vec2::new(2.3, 0.4), Vec2::new(0.3, 0.65));
        let intent = TriangleDefense::new(params()).compute_intent(&world, &TickInput::default());
        assert!((intent.target.x - 2.25).abs() < 1e-5);
        // Clamped to the triangle's lower base y
        assert!((intent.target.y - (0.65 - 0.2)).abs() < 1e-5);
    }
}
