use super::{Intent, Strategy, StrategyParams, TickInput};
use crate::engine::world_model::WorldSnapshot;

/// Return to the home position and wait.
#[derive(Debug, Clone)]
pub struct HomePosition {
    params: StrategyParams,
}

impl HomePosition {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }
}

impl Strategy for HomePosition {
    fn name(&self) -> &'static str {
        "home_position"
    }

    fn init_strategy(&mut self, _world: &WorldSnapshot) {}

    fn compute_intent(&mut self, world: &WorldSnapshot, _input: &TickInput) -> Intent {
        Intent::new(self.params.home(&world.table), 0.4)
    }
}
