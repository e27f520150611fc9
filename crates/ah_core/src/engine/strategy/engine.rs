//! Posture state machine.
//!
//! Each tick the engine votes on a posture from the snapshot:
//!
//! 1. projected puck path enters the controlled goal within the threat
//!    horizon → Defense, immediately
//! 2. puck stale → Defense
//! 3. puck past the midline band on the controlled side and reachable
//!    before the opponent → Offense
//! 4. puck past the band on the opponent side → Defense
//! 5. otherwise keep the current posture
//!
//! Votes 2–4 only take effect once the minimum dwell time has passed since
//! the last switch.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    build_defense, build_offense, Intent, Strategy, StrategyParams, TickInput, UserInputStrategy,
};
use crate::engine::config::{ControlMode, EngineConfig};
use crate::engine::debug_flags::strategy_debug_enabled;
use crate::engine::geometry::Segment;
use crate::engine::timestep::secs_to_us;
use crate::engine::world_model::WorldSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Posture {
    Offense,
    Defense,
    UserControlled,
}

impl Posture {
    pub fn name(self) -> &'static str {
        match self {
            Posture::Offense => "offense",
            Posture::Defense => "defense",
            Posture::UserControlled => "user_controlled",
        }
    }
}

/// Outcome of one posture vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostureVote {
    pub candidate: Option<Posture>,
    /// Bypasses the dwell time
    pub forced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyDecision {
    pub posture: Posture,
    pub strategy: &'static str,
    pub intent: Intent,
    pub switched: bool,
}

pub struct StrategyEngine {
    params: StrategyParams,
    mode: ControlMode,
    offense: Box<dyn Strategy>,
    defense: Box<dyn Strategy>,
    user: Box<dyn Strategy>,
    posture: Posture,
    last_switch_us: Option<u64>,
    started: bool,
}

impl StrategyEngine {
    pub fn new(params: StrategyParams, offense: Box<dyn Strategy>, defense: Box<dyn Strategy>) -> Self {
        let mode = params.config.mode;
        let posture = match mode {
            ControlMode::Autonomous => Posture::Defense,
            ControlMode::UserControlled => Posture::UserControlled,
        };
        Self {
            params,
            mode,
            offense,
            defense,
            user: Box::new(UserInputStrategy::new()),
            posture,
            last_switch_us: None,
            started: false,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let params = StrategyParams::from_config(config);
        let offense = build_offense(config.strategy.offense, &params);
        let defense = build_defense(config.strategy.defense, &params);
        Self::new(params, offense, defense)
    }

    pub fn posture(&self) -> Posture {
        self.posture
    }

    pub fn active(&self) -> &dyn Strategy {
        match self.posture {
            Posture::Offense => self.offense.as_ref(),
            Posture::Defense => self.defense.as_ref(),
            Posture::UserControlled => self.user.as_ref(),
        }
    }

    fn active_mut(&mut self) -> &mut dyn Strategy {
        match self.posture {
            Posture::Offense => self.offense.as_mut(),
            Posture::Defense => self.defense.as_mut(),
            Posture::UserControlled => self.user.as_mut(),
        }
    }

    pub fn guard_lines(&self) -> Vec<Segment> {
        self.active().guard_lines()
    }

    pub fn evaluate_posture(&self, world: &WorldSnapshot) -> PostureVote {
        let cfg = &self.params.config;
        let puck_view = world.puck();

        if puck_view.stale {
            return PostureVote { candidate: Some(Posture::Defense), forced: false };
        }

        let puck = puck_view.body;
        let threat = self
            .params
            .predictor(&world.table)
            .goal_entry(&puck, cfg.threat_horizon_s);
        if threat.is_some() {
            return PostureVote { candidate: Some(Posture::Defense), forced: true };
        }

        let midline = world.table.midline_x();
        let candidate = if puck.position.x > midline + cfg.midline_band_m {
            if world.opponent().stale {
                // Unknown opponent reach: do not commit to a strike
                return PostureVote { candidate: Some(Posture::Defense), forced: false };
            }
            let own_time = self
                .params
                .limits
                .travel_time((puck.position - world.own_mallet().position()).norm());
            let opponent_time =
                (puck.position - world.opponent().position()).norm() / cfg.opponent_speed_mps;
            (own_time + cfg.interception_margin_s < opponent_time).then_some(Posture::Offense)
        } else if puck.position.x < midline - cfg.midline_band_m {
            Some(Posture::Defense)
        } else {
            None
        };
        PostureVote { candidate, forced: false }
    }

    /// Vote, switch if allowed, and ask the active strategy for an intent.
    pub fn decide(&mut self, world: &WorldSnapshot, input: &TickInput) -> StrategyDecision {
        let now = world.taken_at_us;
        if !self.started {
            self.started = true;
            self.active_mut().init_strategy(world);
        }

        let mut switched = false;
        if self.mode == ControlMode::Autonomous {
            let vote = self.evaluate_posture(world);
            if let Some(candidate) = vote.candidate.filter(|c| *c != self.posture) {
                let dwell_us = secs_to_us(self.params.config.min_dwell_s);
                let dwell_elapsed = self
                    .last_switch_us
                    .map_or(true, |t| now.saturating_sub(t) >= dwell_us);
                if vote.forced || dwell_elapsed {
                    info!(
                        from = self.posture.name(),
                        to = candidate.name(),
                        forced = vote.forced,
                        at_us = now,
                        "Posture switch"
                    );
                    self.posture = candidate;
                    self.last_switch_us = Some(now);
                    self.active_mut().init_strategy(world);
                    switched = true;
                }
            }
        }

        let intent = self.active_mut().compute_intent(world, input);
        let strategy = self.active().name();
        if strategy_debug_enabled() {
            debug!(
                posture = self.posture.name(),
                strategy,
                target_x = intent.target.x,
                target_y = intent.target.y,
                urgency = intent.urgency,
                "Strategy intent"
            );
        }
        StrategyDecision { posture: self.posture, strategy, intent, switched }
    }
}
