use super::triangle_defense::GuardTriangle;
use super::{mallet_frame, Intent, Strategy, StrategyParams, TickInput};
use crate::engine::geometry::Segment;
use crate::engine::types::Vec2;
use crate::engine::world_model::WorldSnapshot;

/// Home while the puck is deep in the opponent's third, otherwise block
/// the projected goal entry on the goal guard line.
#[derive(Debug, Clone)]
pub struct HybridDefense {
    params: StrategyParams,
    guard: Option<GuardTriangle>,
}

impl HybridDefense {
    pub fn new(params: StrategyParams) -> Self {
        Self { params, guard: None }
    }
}

impl Strategy for HybridDefense {
    fn name(&self) -> &'static str {
        "hybrid_defense"
    }

    fn init_strategy(&mut self, world: &WorldSnapshot) {
        self.guard = Some(GuardTriangle::for_world(world, &self.params));
    }

    fn compute_intent(&mut self, world: &WorldSnapshot, _input: &TickInput) -> Intent {
        let home = self.params.home(&world.table);
        let puck = world.puck().predictive_body();
        if puck.position.x < world.table.width / 3.0 {
            return Intent::new(home, 0.5);
        }

        let entry = self
            .params
            .predictor(&world.table)
            .goal_entry(&puck, self.params.config.threat_horizon_s);
        match entry {
            Some(entry) => {
                let guard_x = self.params.goal_guard_x(world);
                Intent::new(mallet_frame(world).clamp(Vec2::new(guard_x, entry.point.y)), 1.0)
            }
            None => Intent::new(home, 0.5),
        }
    }

    fn guard_lines(&self) -> Vec<Segment> {
        self.guard.map(|g| g.edges().to_vec()).unwrap_or_default()
    }
}
