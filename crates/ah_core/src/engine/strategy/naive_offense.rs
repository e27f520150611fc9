use super::{mallet_frame, Intent, Strategy, StrategyParams, TickInput};
use crate::engine::world_model::WorldSnapshot;

/// Drive straight through the puck.
///
/// The target lies past the puck on the mallet→puck line, so the mallet
/// still has speed at contact.
#[derive(Debug, Clone)]
pub struct NaiveOffense {
    params: StrategyParams,
}

impl NaiveOffense {
    pub fn new(params: StrategyParams) -> Self {
        Self { params }
    }
}

impl Strategy for NaiveOffense {
    fn name(&self) -> &'static str {
        "naive_offense"
    }

    fn init_strategy(&mut self, _world: &WorldSnapshot) {}

    fn compute_intent(&mut self, world: &WorldSnapshot, _input: &TickInput) -> Intent {
        let puck = world.puck().position();
        let own = world.own_mallet().position();
        let target = puck + (puck - own) * self.params.config.shoot_through_ratio;
        Intent::new(mallet_frame(world).clamp(target), 1.0)
    }
}
