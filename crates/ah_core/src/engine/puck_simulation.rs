//! Closed-loop table simulation standing in for the vision pipeline.
//!
//! Advances the puck with wall reflections, surface friction and mallet
//! contacts, moves a scripted opponent, and emits tracking observations with
//! optional Gaussian noise and occlusion dropouts. All randomness comes from
//! one seeded `ChaCha8Rng`, so a seed reproduces a session exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::{debug, info};

use super::collision::{is_colliding, reflect_off_wall, resolve_against_driven, time_to_wall_collision, Wall};
use super::config::{EngineConfig, PhysicsConfig};
use super::controller::MalletState;
use super::geometry::normalize_or_zero;
use super::physics_constants::mallet;
use super::puck_prediction::GoalSide;
use super::steering::clamp_norm;
use super::table::Table;
use super::timestep::{secs_to_us, us_to_secs, FRAME_INTERVAL_US};
use super::types::{BodyId, MovingBody, Observation, Vec2};
use crate::error::{CoreError, Result};

/// Wall contacts resolved per step before the remainder is dropped
const MAX_WALL_CONTACTS_PER_STEP: usize = 8;

/// Serve direction spread around the x axis (rad)
const SERVE_SPREAD_RAD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Standard deviation of position noise (m)
    pub noise_std_m: f32,
    /// Per-body probability that a frame misses it
    pub dropout_probability: f64,
    /// Scripted opponent speed; 0 keeps it still
    pub opponent_speed_mps: f32,
    pub serve_speed_mps: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { noise_std_m: 0.0, dropout_probability: 0.0, opponent_speed_mps: 1.5, serve_speed_mps: 1.5 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Score {
    /// Goals scored into the controlled goal
    pub conceded: u32,
    pub scored: u32,
}

pub struct TableSimulation {
    table: Table,
    physics: PhysicsConfig,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    noise: Option<Normal<f32>>,
    puck: MovingBody,
    own: MovingBody,
    opponent: MovingBody,
    time_us: u64,
    score: Score,
}

impl TableSimulation {
    pub fn new(engine: &EngineConfig, config: SimulationConfig, seed: u64) -> Result<Self> {
        let noise = if config.noise_std_m > 0.0 {
            Some(
                Normal::new(0.0, config.noise_std_m)
                    .map_err(|e| CoreError::InvalidConfig(format!("noise: {e}")))?,
            )
        } else {
            None
        };
        if !(0.0..=1.0).contains(&config.dropout_probability) {
            return Err(CoreError::InvalidConfig(format!(
                "dropout probability {} outside [0, 1]",
                config.dropout_probability
            )));
        }

        let table = engine.table_geometry();
        let physics = engine.physics.clone();
        let puck = MovingBody::new(BodyId::Puck, table.center(), physics.puck_radius_m, physics.puck_mass_kg);
        let own = MovingBody::new(
            BodyId::OwnMallet,
            table.home_position(engine.strategy.home_x_ratio),
            physics.mallet_radius_m,
            physics.mallet_mass_kg,
        );
        let opponent = MovingBody::new(
            BodyId::OpponentMallet,
            Vec2::new(mallet::OPPONENT_START_X_RATIO * table.width, table.height / 2.0),
            physics.mallet_radius_m,
            physics.mallet_mass_kg,
        );

        Ok(Self {
            table,
            physics,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise,
            puck,
            own,
            opponent,
            time_us: 0,
            score: Score::default(),
        })
    }

    pub fn time_us(&self) -> u64 {
        self.time_us
    }

    pub fn puck(&self) -> &MovingBody {
        &self.puck
    }

    pub fn opponent(&self) -> &MovingBody {
        &self.opponent
    }

    pub fn score(&self) -> Score {
        self.score
    }

    /// Place the puck directly (tests and scripted scenarios).
    pub fn place_puck(&mut self, position: Vec2, velocity: Vec2) {
        self.puck.position = position;
        self.puck.velocity = velocity;
    }

    pub fn place_opponent(&mut self, position: Vec2) {
        self.opponent.position = position;
        self.opponent.velocity = Vec2::zeros();
    }

    /// Controlled mallet state as reported by the controller.
    pub fn set_own_mallet(&mut self, state: &MalletState) {
        self.own.position = state.position;
        self.own.velocity = state.velocity;
    }

    /// Puck to the centre, moving toward a random side.
    pub fn serve(&mut self) {
        let angle = self.rng.gen_range(-SERVE_SPREAD_RAD..SERVE_SPREAD_RAD);
        let sign = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let velocity = Vec2::new(sign * angle.cos(), angle.sin()) * self.config.serve_speed_mps;
        self.place_puck(self.table.center(), velocity);
        debug!(vx = velocity.x, vy = velocity.y, "Serve");
    }

    /// Advance in frame-sized steps up to `now_us`. Returns the goals scored.
    pub fn advance_to(&mut self, now_us: u64) -> Vec<GoalSide> {
        let mut goals = Vec::new();
        while self.time_us < now_us {
            let step_us = (now_us - self.time_us).min(FRAME_INTERVAL_US);
            goals.extend(self.advance(us_to_secs(step_us), step_us));
        }
        goals
    }

    /// Advance by `dt` seconds.
    pub fn step(&mut self, dt: f32) -> Option<GoalSide> {
        self.advance(dt, secs_to_us(dt))
    }

    fn advance(&mut self, dt: f32, dt_us: u64) -> Option<GoalSide> {
        self.time_us += dt_us;
        self.move_opponent(dt);

        let goal = self.move_puck(dt);
        if let Some(side) = goal {
            match side {
                GoalSide::Own => self.score.conceded += 1,
                GoalSide::Opponent => self.score.scored += 1,
            }
            info!(?side, conceded = self.score.conceded, scored = self.score.scored, "Goal");
            self.serve();
            return goal;
        }

        for mallet in [self.own, self.opponent] {
            self.resolve_mallet_contact(&mallet);
        }

        let decay = (1.0 - self.physics.surface_friction_per_s * dt).max(0.0);
        self.puck.velocity *= decay;
        None
    }

    fn move_puck(&mut self, dt: f32) -> Option<GoalSide> {
        let mut remaining = dt;
        for _ in 0..MAX_WALL_CONTACTS_PER_STEP {
            match time_to_wall_collision(&self.puck, &self.table) {
                Some(hit) if hit.time <= remaining => {
                    self.puck = self.puck.advanced(hit.time);
                    remaining -= hit.time;
                    if self.table.is_in_goal_y(self.puck.position.y) {
                        match hit.wall {
                            Wall::Right => return Some(GoalSide::Own),
                            Wall::Left => return Some(GoalSide::Opponent),
                            _ => {}
                        }
                    }
                    self.puck.velocity =
                        reflect_off_wall(self.puck.velocity, hit.wall, self.physics.wall_restitution);
                }
                _ => {
                    self.puck = self.puck.advanced(remaining);
                    break;
                }
            }
        }
        self.puck.position = self.table.collision_frame(self.puck.radius).clamp(self.puck.position);
        None
    }

    fn resolve_mallet_contact(&mut self, mallet: &MovingBody) {
        if !is_colliding(&self.puck, mallet) {
            return;
        }
        let normal = normalize_or_zero(self.puck.position - mallet.position);
        if normal != Vec2::zeros() {
            let contact = mallet.position + normal * (self.puck.radius + mallet.radius);
            self.puck.position = self.table.collision_frame(self.puck.radius).clamp(contact);
        }
        let velocity = resolve_against_driven(&self.puck, mallet, self.physics.mallet_restitution);
        self.puck.velocity = clamp_norm(velocity, self.physics.max_puck_speed_mps);
    }

    /// Shadow the puck's y on the opponent half, stepping in toward the puck
    /// when it is on that half.
    fn move_opponent(&mut self, dt: f32) {
        let frame = self.table.collision_frame(self.opponent.radius);
        let max_x = self.table.midline_x() - self.opponent.radius;
        let home_x = mallet::OPPONENT_START_X_RATIO * self.table.width;
        let target_x = if self.puck.position.x < max_x { self.puck.position.x } else { home_x };
        let target = frame.clamp(Vec2::new(target_x, self.puck.position.y));

        let step = clamp_norm(target - self.opponent.position, self.config.opponent_speed_mps * dt);
        let previous = self.opponent.position;
        self.opponent.position = frame.clamp(previous + step);
        self.opponent.velocity = if dt > 0.0 { (self.opponent.position - previous) / dt } else { Vec2::zeros() };
    }

    /// Tracking frame for the puck and the opponent. The controlled mallet
    /// is fed back by its controller and is not observed here.
    pub fn observe(&mut self) -> Vec<Observation> {
        let mut frame = Vec::with_capacity(2);
        for body in [self.puck, self.opponent] {
            if self.config.dropout_probability > 0.0 && self.rng.gen_bool(self.config.dropout_probability) {
                continue;
            }
            let mut position = body.position;
            if let Some(noise) = &self.noise {
                position += Vec2::new(noise.sample(&mut self.rng), noise.sample(&mut self.rng));
            }
            frame.push(Observation::at(body.id, position, self.time_us));
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.01;

    fn still_opponent() -> SimulationConfig {
        SimulationConfig { opponent_speed_mps: 0.0, ..SimulationConfig::default() }
    }

    fn sim(config: SimulationConfig, seed: u64) -> TableSimulation {
        let mut sim = TableSimulation::new(&EngineConfig::default(), config, seed).unwrap();
        sim.set_own_mallet(&MalletState::at_rest(Vec2::new(2.25, 0.15)));
        sim
    }

    #[test]
    fn test_puck_bounces_off_side_wall() {
        let mut sim = sim(still_opponent(), 1);
        sim.place_puck(Vec2::new(1.25, 0.9), Vec2::new(0.0, 1.0));
        for _ in 0..50 {
            assert_eq!(sim.step(DT), None);
        }
        let puck = sim.puck();
        assert!(puck.velocity.y < 0.0);
        assert!(puck.position.y <= 1.3 - puck.radius + 1e-5);
        // Restitution and friction both take energy out
        assert!(puck.speed() < 1.0);
    }

    #[test]
    fn test_goal_in_controlled_goal() {
        let mut sim = sim(still_opponent(), 2);
        sim.place_puck(Vec2::new(2.0, 0.65), Vec2::new(2.0, 0.0));
        let goals = sim.advance_to(500_000);
        assert_eq!(goals, vec![GoalSide::Own]);
        assert_eq!(sim.score(), Score { conceded: 1, scored: 0 });
        // Re-served from the centre
        assert!(sim.puck().position.x < 2.0);
    }

    #[test]
    fn test_shot_off_goal_rebounds() {
        let mut sim = sim(still_opponent(), 3);
        sim.place_puck(Vec2::new(2.0, 1.1), Vec2::new(2.0, 0.0));
        assert!(sim.advance_to(500_000).is_empty());
        assert!(sim.puck().velocity.x < 0.0);
    }

    #[test]
    fn test_mallet_deflects_puck() {
        let mut sim = sim(still_opponent(), 4);
        sim.set_own_mallet(&MalletState::at_rest(Vec2::new(2.2, 0.65)));
        sim.place_puck(Vec2::new(1.9, 0.65), Vec2::new(1.0, 0.0));
        for _ in 0..30 {
            sim.step(DT);
        }
        assert!(sim.puck().velocity.x < 0.0);
        assert!((sim.puck().position - Vec2::new(2.2, 0.65)).norm() >= 0.12 - 1e-4);
    }

    #[test]
    fn test_opponent_stays_on_its_half() {
        let mut sim = sim(SimulationConfig::default(), 5);
        sim.place_puck(Vec2::new(1.2, 0.3), Vec2::new(0.0, 0.0));
        for _ in 0..300 {
            sim.step(DT);
            assert!(sim.opponent().position.x <= 1.25 - sim.opponent().radius + 1e-5);
        }
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let config = SimulationConfig { noise_std_m: 0.003, dropout_probability: 0.2, ..SimulationConfig::default() };
        let mut a = sim(config.clone(), 42);
        let mut b = sim(config, 42);
        a.serve();
        b.serve();
        for _ in 0..100 {
            a.step(DT);
            b.step(DT);
            assert_eq!(a.observe(), b.observe());
        }
    }

    #[test]
    fn test_full_dropout_yields_empty_frames() {
        let config = SimulationConfig { dropout_probability: 1.0, ..SimulationConfig::default() };
        let mut sim = sim(config, 6);
        sim.step(DT);
        assert!(sim.observe().is_empty());
    }

    #[test]
    fn test_rejects_bad_dropout() {
        let config = SimulationConfig { dropout_probability: 1.5, ..SimulationConfig::default() };
        assert!(TableSimulation::new(&EngineConfig::default(), config, 0).is_err());
    }
}
