use super::{mallet_frame, Intent, Strategy, TickInput};
use crate::engine::world_model::WorldSnapshot;

/// Input-device passthrough, clamped to the table minus the mallet radius.
///
/// Without a sample this tick the mallet holds its position.
#[derive(Debug, Clone, Default)]
pub struct UserInputStrategy;

impl UserInputStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Strategy for UserInputStrategy {
    fn name(&self) -> &'static str {
        "user_input"
    }

    fn init_strategy(&mut self, _world: &WorldSnapshot) {}

    fn compute_intent(&mut self, world: &WorldSnapshot, input: &TickInput) -> Intent {
        let target = input
            .user_sample
            .filter(|s| s.iter().all(|c| c.is_finite()))
            .unwrap_or_else(|| world.own_mallet().position());
        Intent::new(mallet_frame(world).clamp(target), 1.0)
    }
}
