use super::{mallet_frame, Intent, Strategy, StrategyParams, TickInput};
use crate::engine::geometry::Segment;
use crate::engine::types::Vec2;
use crate::engine::world_model::WorldSnapshot;

/// Meet the puck where it will cross the mallet's current x, taking that
/// y back to the home line.
#[derive(Debug, Clone)]
pub struct RetreatingDefense {
    params: StrategyParams,
    defence_line: Option<Segment>,
}

impl RetreatingDefense {
    pub fn new(params: StrategyParams) -> Self {
        Self { params, defence_line: None }
    }
}

impl Strategy for RetreatingDefense {
    fn name(&self) -> &'static str {
        "retreating_defense"
    }

    fn init_strategy(&mut self, _world: &WorldSnapshot) {
        self.defence_line = None;
    }

    fn compute_intent(&mut self, world: &WorldSnapshot, _input: &TickInput) -> Intent {
        let home = self.params.home(&world.table);
        let own_x = world.own_mallet().position().x;
        self.defence_line =
            Some(Segment::new(Vec2::new(own_x, 0.0), Vec2::new(own_x, world.table.height)));

        let puck = world.puck().predictive_body();
        let crossing = self
            .params
            .predictor(&world.table)
            .line_crossing(&puck, self.params.config.threat_horizon_s, own_x);
        match crossing {
            Some((point, _)) => Intent::new(mallet_frame(world).clamp(Vec2::new(home.x, point.y)), 0.9),
            None => Intent::new(home, 0.5),
        }
    }

    fn guard_lines(&self) -> Vec<Segment> {
        self.defence_line.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{params, snapshot};
    use super::*;

    #[test]
    fn test_crossing_y_on_home_line() {
        let world = snapshot(Vec2::new(1.3, 0.4), Vec2::new(2.0, 0.2), Vec2::new(2.0, 0.65), Vec2::new(0.3, 0.65));
        let intent = RetreatingDefense::new(params()).compute_intent(&world, &TickInput::default());
        // Crosses x = 2.0 after 0.35 s at y = 0.47
        assert!((intent.target.x - 2.25).abs() < 1e-5);
        assert!((intent.target.y - 0.47).abs() < 1e-4);
    }

    #[test]
    fn test_no_crossing_goes_home() {
        let world = snapshot(Vec2::new(1.0, 0.4), Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.65), Vec2::new(0.3, 0.65));
        let mut s = RetreatingDefense::new(params());
        let intent = s.compute_intent(&world, &TickInput::default());
        assert!((intent.target - Vec2::new(2.25, 0.65)).norm() < 1e-5);
        assert_eq!(s.guard_lines().len(), 1);
    }
}
