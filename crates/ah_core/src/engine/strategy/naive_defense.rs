use super::{mallet_frame, Intent, Strategy, StrategyParams, TickInput};
use crate::engine::types::Vec2;
use crate::engine::world_model::WorldSnapshot;

/// Shadow the puck's y on the home line.
#[derive(Debug, Clone)]
pub struct NaiveDefense {
    params: StrategyParams,
}

impl NaiveDefense {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }
}

impl Strategy for NaiveDefense {
    fn name(&self) -> &'static str {
        "naive_defense"
    }

    fn init_strategy(&mut self, _world: &WorldSnapshot) {}

    fn compute_intent(&mut self, world: &WorldSnapshot, _input: &TickInput) -> Intent {
        let home = self.params.home(&world.table);
        let target = Vec2::new(home.x, world.puck().position().y);
        Intent::new(mallet_frame(world).clamp(target), 0.7)
    }
}
