use serde::Serialize;

use super::{mallet_frame, Intent, Strategy, StrategyParams, TickInput};
use crate::engine::geometry::{normalize_or_zero, Segment};
use crate::engine::types::Vec2;
use crate::engine::world_model::WorldSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum Stage {
    /// Get behind the puck on the shot line
    Approach,
    /// Drive through the puck toward the opponent goal
    Strike,
    /// Back to home before the next attempt
    Recover,
}

/// Approach-then-strike waypoint pair aimed at the opponent goal.
///
/// Waypoints are rebuilt while approaching whenever the puck drifts more
/// than the replan distance from where they were computed.
#[derive(Debug, Clone)]
pub struct WaypointOffense {
    params: StrategyParams,
    stage: Stage,
    approach: Vec2,
    strike: Vec2,
    /// Puck position the waypoints were computed for
    anchor: Option<Vec2>,
}

impl WaypointOffense {
    pub fn new(params: StrategyParams) -> Self {
        Self {
            params,
            stage: Stage::Approach,
            approach: Vec2::zeros(),
            strike: Vec2::zeros(),
            anchor: None,
        }
    }

    fn rebuild(&mut self, world: &WorldSnapshot) {
        let frame = mallet_frame(world);
        let puck = world.puck().body;
        let mallet_radius = world.own_mallet().body.radius;
        let cfg = &self.params.config;

        let shot_dir = normalize_or_zero(world.table.opponent_goal_center() - puck.position);
        let standoff = puck.radius + mallet_radius + cfg.approach_gap_m;
        self.approach = frame.clamp(puck.position - shot_dir * standoff);
        self.strike = frame.clamp(puck.position + shot_dir * cfg.strike_through_m);
        self.anchor = Some(puck.position);
        self.stage = Stage::Approach;
    }

    fn reached(&self, own: Vec2, waypoint: Vec2) -> bool {
        (own - waypoint).norm() <= self.params.config.waypoint_switch_distance_m
    }
}

impl Strategy for WaypointOffense {
    fn name(&self) -> &'static str {
        "waypoint_offense"
    }

    fn init_strategy(&mut self, world: &WorldSnapshot) {
        self.rebuild(world);
    }

    fn compute_intent(&mut self, world: &WorldSnapshot, _input: &TickInput) -> Intent {
        let puck = world.puck().position();
        let own = world.own_mallet().position();
        let replan = self.params.config.replan_distance_m;
        let puck_moved = self.anchor.map_or(true, |a| (puck - a).norm() > replan);

        match self.stage {
            Stage::Approach if puck_moved => self.rebuild(world),
            // Contact made (or missed): the puck has left the strike line
            Stage::Strike if puck_moved => self.stage = Stage::Recover,
            _ => {}
        }

        let home = self.params.home(&world.table);
        match self.stage {
            Stage::Approach if self.reached(own, self.approach) => self.stage = Stage::Strike,
            Stage::Strike if self.reached(own, self.strike) => self.stage = Stage::Recover,
            Stage::Recover if self.reached(own, home) => self.rebuild(world),
            _ => {}
        }

        match self.stage {
            Stage::Approach => Intent::new(self.approach, 0.8),
            Stage::Strike => Intent::new(self.strike, 1.0),
            Stage::Recover => Intent::new(home, 0.5),
        }
    }

    fn guard_lines(&self) -> Vec<Segment> {
        if self.anchor.is_some() {
            vec![Segment::new(self.approach, self.strike)]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{params, snapshot};
    use super::*;

    fn world_with(puck: Vec2, own: Vec2) -> WorldSnapshot {
        snapshot(puck, Vec2::zeros(), own, Vec2::new(0.3, 0.65))
    }

    #[test]
    fn test_approach_sits_behind_puck() {
        let world = world_with(Vec2::new(1.8, 0.65), Vec2::new(2.25, 0.65));
        let mut s = WaypointOffense::new(params());
        s.init_strategy(&world);
        let intent = s.compute_intent(&world, &TickInput::default());
        // Behind = toward our own goal, on the shot line
        let standoff = 0.05 + 0.07 + 0.03;
        assert!((intent.target - Vec2::new(1.8 + standoff, 0.65)).norm() < 1e-5);
        assert!((intent.urgency - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_advances_to_strike_then_recovers() {
        let puck = Vec2::new(1.8, 0.65);
        let mut s = WaypointOffense::new(params());
        s.init_strategy(&world_with(puck, Vec2::new(2.25, 0.65)));

        let at_approach = world_with(puck, Vec2::new(1.95, 0.65));
        let intent = s.compute_intent(&at_approach, &TickInput::default());
        assert!((intent.target - Vec2::new(1.65, 0.65)).norm() < 1e-5);
        assert_eq!(intent.urgency, 1.0);

        // Puck knocked away: recover to home
        let after_hit = world_with(Vec2::new(1.4, 0.65), Vec2::new(1.7, 0.65));
        let intent = s.compute_intent(&after_hit, &TickInput::default());
        assert!((intent.target - Vec2::new(2.25, 0.65)).norm() < 1e-5);
    }

    #[test]
    fn test_replans_when_puck_drifts() {
        let mut s = WaypointOffense::new(params());
        s.init_strategy(&world_with(Vec2::new(1.8, 0.65), Vec2::new(2.25, 0.65)));
        let drifted = world_with(Vec2::new(1.8, 0.4), Vec2::new(2.25, 0.65));
        let intent = s.compute_intent(&drifted, &TickInput::default());
        assert!(intent.target.y < 0.65);
        assert_eq!(s.guard_lines().len(), 1);
    }
}
