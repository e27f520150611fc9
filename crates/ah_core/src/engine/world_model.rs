//! World model: latest known state of the puck and both mallets.
//!
//! Written by the tracking ingest (possibly from a camera thread) and by the
//! controller feedback path; read once per tick through [`WorldModel::snapshot`].
//! The only lock in the loop lives here and is never held across a tick.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{EngineConfig, PhysicsConfig, TrackingConfig};
use super::controller::MalletState;
use super::table::Table;
use super::timestep::us_to_secs;
use super::types::{BodyId, MovingBody, Observation, Vec2};
use crate::engine::physics_constants::mallet;

#[derive(Debug, Clone, Copy)]
struct Track {
    body: MovingBody,
    last_seen_us: Option<u64>,
    /// False until a velocity has been supplied or estimated since the last reset
    velocity_seeded: bool,
}

impl Track {
    fn unseen(body: MovingBody) -> Self {
        Self { body, last_seen_us: None, velocity_seeded: false }
    }
}

#[derive(Debug, Clone)]
struct WorldState {
    tracks: [Track; 3],
}

/// Read-only view of one body inside a [`WorldSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyView {
    pub body: MovingBody,
    /// No observation within the staleness timeout
    pub stale: bool,
    /// Time since the last observation; `None` if never observed
    pub age_us: Option<u64>,
}

impl BodyView {
    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    /// Body to use for forward prediction. A stale body is taken at its last
    /// known position with zero velocity.
    pub fn predictive_body(&self) -> MovingBody {
        if self.stale {
            self.body.with_velocity(Vec2::zeros())
        } else {
            self.body
        }
    }
}

/// Consistent point-in-time copy of the world, consumed by one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub taken_at_us: u64,
    pub table: Table,
    pub bodies: [BodyView; 3],
}

impl WorldSnapshot {
    pub fn view(&self, id: BodyId) -> &BodyView {
        &self.bodies[id.index()]
    }

    pub fn puck(&self) -> &BodyView {
        self.view(BodyId::Puck)
    }

    pub fn own_mallet(&self) -> &BodyView {
        self.view(BodyId::OwnMallet)
    }

    pub fn opponent(&self) -> &BodyView {
        self.view(BodyId::OpponentMallet)
    }

    pub fn any_stale(&self) -> bool {
        self.bodies.iter().any(|b| b.stale)
    }
}

pub struct WorldModel {
    table: Table,
    tracking: TrackingConfig,
    state: Mutex<WorldState>,
}

impl WorldModel {
    /// Bodies start at their rest positions and stale until first observed.
    /// The own mallet rests at `home_x_ratio` of the table width.
    pub fn new(table: Table, physics: &PhysicsConfig, tracking: TrackingConfig, home_x_ratio: f32) -> Self {
        let puck = MovingBody::new(
            BodyId::Puck,
            table.center(),
            physics.puck_radius_m,
            physics.puck_mass_kg,
        );
        let own = MovingBody::new(
            BodyId::OwnMallet,
            table.home_position(home_x_ratio),
            physics.mallet_radius_m,
            physics.mallet_mass_kg,
        );
        let opponent = MovingBody::new(
            BodyId::OpponentMallet,
            Vec2::new(mallet::OPPONENT_START_X_RATIO * table.width, table.height / 2.0),
            physics.mallet_radius_m,
            physics.mallet_mass_kg,
        );
        Self {
            table,
            tracking,
            state: Mutex::new(WorldState {
                tracks: [Track::unseen(puck), Track::unseen(own), Track::unseen(opponent)],
            }),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.table_geometry(),
            &config.physics,
            config.tracking.clone(),
            config.strategy.home_x_ratio,
        )
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn stale_timeout_us(&self) -> u64 {
        self.tracking.stale_timeout_us()
    }

    fn lock(&self) -> MutexGuard<'_, WorldState> {
        // A panicking writer cannot leave a track half-written: updates are
        // single Copy assignments, so the poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one tracking observation. Returns `false` when it was ignored
    /// (out of order, duplicate or non-finite).
    pub fn ingest(&self, obs: Observation) -> bool {
        let mut state = self.lock();
        self.apply(&mut state, &obs)
    }

    /// Apply a whole camera frame under one lock. Returns the number of
    /// accepted observations.
    pub fn ingest_frame(&self, observations: &[Observation]) -> usize {
        let mut state = self.lock();
        observations.iter().filter(|obs| self.apply(&mut state, obs)).count()
    }

    /// Controller feedback for the controlled mallet.
    pub fn report_own_mallet(&self, mallet: &MalletState, timestamp_us: u64) -> bool {
        self.ingest(
            Observation::at(BodyId::OwnMallet, mallet.position, timestamp_us)
                .with_velocity(mallet.velocity),
        )
    }

    pub fn snapshot(&self, now_us: u64) -> WorldSnapshot {
        let state = self.lock();
        let timeout = self.tracking.stale_timeout_us();
        let bodies = state.tracks.map(|track| {
            let age_us = track.last_seen_us.map(|seen| now_us.saturating_sub(seen));
            BodyView {
                body: track.body,
                stale: age_us.map_or(true, |age| age > timeout),
                age_us,
            }
        });
        WorldSnapshot { taken_at_us: now_us, table: self.table, bodies }
    }

    fn apply(&self, state: &mut WorldState, obs: &Observation) -> bool {
        if !obs.position.iter().all(|c| c.is_finite()) {
            debug!(body = obs.body.name(), "Ignoring non-finite observation");
            return false;
        }
        let track = &mut state.tracks[obs.body.index()];
        let gap_us = match track.last_seen_us {
            Some(last) if obs.timestamp_us <= last => return false,
            Some(last) => Some(obs.timestamp_us - last),
            None => None,
        };

        let (position, out_of_bounds) = if obs.body.is_mallet() {
            (self.table.collision_frame(track.body.radius).clamp(obs.position), false)
        } else {
            (obs.position, !self.table.contains(obs.position))
        };

        let timeout = self.tracking.stale_timeout_us();
        let supplied = obs.velocity.filter(|v| v.iter().all(|c| c.is_finite()));
        let velocity = match (supplied, gap_us) {
            (Some(v), _) => {
                track.velocity_seeded = true;
                v
            }
            (None, Some(gap)) if gap <= timeout => {
                let raw = (position - track.body.position) / us_to_secs(gap);
                if track.velocity_seeded {
                    let alpha = self.tracking.velocity_ema_alpha;
                    raw * alpha + track.body.velocity * (1.0 - alpha)
                } else {
                    track.velocity_seeded = true;
                    raw
                }
            }
            // First sighting or the previous sample is too old to difference against
            _ => {
                track.velocity_seeded = false;
                Vec2::zeros()
            }
        };

        track.body.position = position;
        track.body.velocity = velocity;
        track.body.timestamp_us = obs.timestamp_us;
        track.body.out_of_bounds = out_of_bounds;
        track.last_seen_us = Some(obs.timestamp_us);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn model() -> WorldModel {
        WorldModel::from_config(&EngineConfig::default())
    }

    #[test]
    fn test_unseen_bodies_are_stale() {
        let world = model();
        let snap = world.snapshot(0);
        assert!(snap.bodies.iter().all(|b| b.stale && b.age_us.is_none()));
        assert_eq!(snap.puck().position(), snap.table.center());
    }

    #[test]
    fn test_own_mallet_rests_at_configured_home() {
        let mut config = EngineConfig::default();
        config.strategy.home_x_ratio = 0.8;
        let world = WorldModel::from_config(&config);
        let own = world.snapshot(0).own_mallet().body.position;
        assert!((own - Vec2::new(2.0, 0.65)).norm() < 1e-6);
    }

    #[test]
    fn test_staleness_after_timeout() {
        let world = model();
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.0, 0.5), 1_000));
        let timeout = world.stale_timeout_us();
        assert!(!world.snapshot(1_000 + timeout).puck().stale);
        assert!(world.snapshot(1_000 + timeout + 1).puck().stale);
    }

    #[test]
    fn test_finite_difference_then_smoothing() {
        let world = model();
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.0, 0.5), 0));
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.01, 0.5), 10_000));
        let v1 = world.snapshot(10_000).puck().body.velocity;
        assert!((v1.x - 1.0).abs() < 1e-3);

        // Jump to 3 m/s: EMA with alpha 0.5 lands halfway
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.04, 0.5), 20_000));
        let v2 = world.snapshot(20_000).puck().body.velocity;
        assert!((v2.x - 2.0).abs() < 1e-2);
    }

    #[test]
    fn test_supplied_velocity_used_directly() {
        let world = model();
        let obs = Observation::at(BodyId::Puck, Vec2::new(1.0, 0.5), 0)
            .with_velocity(Vec2::new(-2.0, 0.5));
        world.ingest(obs);
        assert_eq!(world.snapshot(0).puck().body.velocity, Vec2::new(-2.0, 0.5));
    }

    #[test]
    fn test_velocity_restarts_after_gap() {
        let world = model();
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.0, 0.5), 0));
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.01, 0.5), 10_000));
        let late = 10_000 + world.stale_timeout_us() + 1;
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(2.0, 0.5), late));
        assert_eq!(world.snapshot(late).puck().body.velocity, Vec2::zeros());
    }

    #[test]
    fn test_out_of_order_and_duplicates_ignored() {
        let world = model();
        assert!(world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.0, 0.5), 5_000)));
        assert!(!world.ingest(Observation::at(BodyId::Puck, Vec2::new(2.0, 0.5), 5_000)));
        assert!(!world.ingest(Observation::at(BodyId::Puck, Vec2::new(2.0, 0.5), 4_000)));
        assert_eq!(world.snapshot(5_000).puck().position(), Vec2::new(1.0, 0.5));
    }

    #[test]
    fn test_non_finite_ignored() {
        let world = model();
        assert!(!world.ingest(Observation::at(BodyId::Puck, Vec2::new(f32::NAN, 0.5), 1)));
    }

    #[test]
    fn test_puck_in_goal_flagged_mallet_clamped() {
        let world = model();
        let table = *world.table();
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(table.width + 0.02, 0.65), 1));
        world.ingest(Observation::at(BodyId::OpponentMallet, Vec2::new(-0.5, 2.0), 1));
        let snap = world.snapshot(1);
        assert!(snap.puck().body.out_of_bounds);
        let opp = snap.opponent().position();
        let frame = table.collision_frame(snap.opponent().body.radius);
        assert!(frame.contains(opp));
        assert!(!snap.opponent().body.out_of_bounds);
    }

    #[test]
    fn test_report_own_mallet() {
        let world = model();
        let state = MalletState { position: Vec2::new(2.0, 0.6), velocity: Vec2::new(0.5, 0.0) };
        world.report_own_mallet(&state, 100);
        let own = *world.snapshot(100).own_mallet();
        assert_eq!(own.position(), Vec2::new(2.0, 0.6));
        assert_eq!(own.body.velocity, Vec2::new(0.5, 0.0));
        assert!(!own.stale);
    }

    #[test]
    fn test_stale_predictive_body_has_no_velocity() {
        let world = model();
        let obs = Observation::at(BodyId::OpponentMallet, Vec2::new(0.5, 0.5), 0)
            .with_velocity(Vec2::new(1.0, 0.0));
        world.ingest(obs);
        let snap = world.snapshot(1_000_000);
        assert!(snap.opponent().stale);
        assert_eq!(snap.opponent().predictive_body().velocity, Vec2::zeros());
        assert_eq!(snap.opponent().body.velocity, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_concurrent_ingest_never_tears_frames() {
        let world = Arc::new(model());
        let producer = {
            let world = Arc::clone(&world);
            thread::spawn(move || {
                for k in 1..=2_000u64 {
                    let x = 0.2 + (k % 100) as f32 * 0.01;
                    let frame = [
                        Observation::at(BodyId::Puck, Vec2::new(x, 0.5), k),
                        Observation::at(BodyId::OwnMallet, Vec2::new(x, 0.5), k),
                        Observation::at(BodyId::OpponentMallet, Vec2::new(x, 0.5), k),
                    ];
                    world.ingest_frame(&frame);
                }
            })
        };

        for _ in 0..2_000 {
            let snap = world.snapshot(0);
            let ts = snap.puck().body.timestamp_us;
            assert!(snap.bodies.iter().all(|b| b.body.timestamp_us == ts));
        }
        producer.join().unwrap();
        assert_eq!(world.snapshot(2_000).puck().body.timestamp_us, 2_000);
    }
}
