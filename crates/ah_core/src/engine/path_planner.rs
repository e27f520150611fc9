//! Bounded-depth path planner for the controlled mallet.
//!
//! Each tick produces at most three waypoints: the current position, an
//! optional evasive waypoint around the opponent mallet, and the (clamped)
//! target. This is not a global search; the cost is constant per tick.
//!
//! Evasion uses the collision model against the opponent's projected
//! position. The evasive waypoint sits on the perpendicular to the direct
//! line through that position, far enough out that both legs keep
//! `radius sum + safety epsilon` of clearance.

use serde::Serialize;
use tracing::debug;

use super::collision::time_to_collision;
use super::config::{MotionLimits, PlannerConfig};
use super::debug_flags::planner_debug_enabled;
use super::geometry::{normalize_or_zero, perpendicular, Rect, Segment, GEOMETRY_EPSILON};
use super::strategy::Intent;
use super::trajectory::{Trajectory, Waypoint};
use super::types::Vec2;
use super::world_model::WorldSnapshot;

/// Targets closer than this to the start produce a hold (m)
const MIN_MOVE_M: f32 = 1e-4;

/// Clearance check slack for clamped candidates (m)
const CLEARANCE_TOLERANCE_M: f32 = 1e-4;

/// Growth factor and attempts when a tangent offset loses clearance to the
/// opponent's lateral offset
const OFFSET_GROWTH: f32 = 1.25;
const OFFSET_ATTEMPTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanKind {
    /// Already at the target
    Hold,
    Direct,
    /// One evasive waypoint inserted
    Evasive,
    /// No evasive waypoint fits: stop before contact on the direct line
    StopShort,
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub trajectory: Trajectory,
    pub kind: PlanKind,
    /// The requested target was outside the reachable envelope
    pub target_clamped: bool,
}

/// Evasion parameters around one opponent position.
#[derive(Debug, Clone, Copy)]
struct Obstacle {
    center: Vec2,
    clearance: f32,
}

impl Obstacle {
    fn clears(&self, leg: &Segment) -> bool {
        leg.distance_to(self.center) >= self.clearance - CLEARANCE_TOLERANCE_M
    }
}

#[derive(Debug, Clone)]
pub struct PathPlanner {
    limits: MotionLimits,
    config: PlannerConfig,
}

impl PathPlanner {
    pub fn new(limits: MotionLimits, config: PlannerConfig) -> Self {
        Self { limits, config }
    }

    pub fn limits(&self) -> &MotionLimits {
        &self.limits
    }

    /// Region the mallet centre may be planned into.
    pub fn envelope(&self, snapshot: &WorldSnapshot) -> Rect {
        let radius = snapshot.own_mallet().body.radius;
        let frame = snapshot.table.collision_frame(radius);
        if self.config.own_half_only {
            frame.with_min_x(snapshot.table.midline_x() + self.config.midline_margin_m + radius)
        } else {
            frame
        }
    }

    /// Trajectory toward `target` at full urgency.
    pub fn plan(&self, snapshot: &WorldSnapshot, target: Vec2) -> Trajectory {
        self.plan_intent(snapshot, &Intent::new(target, 1.0)).trajectory
    }

    pub fn plan_intent(&self, snapshot: &WorldSnapshot, intent: &Intent) -> Plan {
        let own = snapshot.own_mallet().body;
        let start = own.position;
        let envelope = self.envelope(snapshot);

        let requested = if intent.target.iter().all(|c| c.is_finite()) { intent.target } else { start };
        let goal = envelope.clamp(requested);
        let target_clamped = (goal - requested).norm() > GEOMETRY_EPSILON;

        if (goal - start).norm() < MIN_MOVE_M {
            return Plan { trajectory: Trajectory::hold(start), kind: PlanKind::Hold, target_clamped };
        }

        let cruise = self
            .limits
            .with_speed_fraction(intent.urgency.max(self.config.min_speed_fraction));

        let (route, kind) = match self.conflict(snapshot, start, goal, &cruise) {
            None => (vec![goal], PlanKind::Direct),
            Some(obstacle) => match self.evasive_waypoint(snapshot, &envelope, start, goal, &obstacle) {
                Some(evasive) => (vec![evasive, goal], PlanKind::Evasive),
                None => (vec![self.stop_short(&envelope, start, goal, &obstacle)], PlanKind::StopShort),
            },
        };

        if planner_debug_enabled() {
            debug!(?kind, goal_x = goal.x, goal_y = goal.y, target_clamped, "Planned trajectory");
        }

        let trajectory = self.timed(start, &route, &cruise);
        trajectory.check_contract(&snapshot.table.collision_frame(own.radius));
        Plan { trajectory, kind, target_clamped }
    }

    /// Opponent position to evade if the direct leg runs into it soon.
    fn conflict(&self, snapshot: &WorldSnapshot, start: Vec2, goal: Vec2, cruise: &MotionLimits) -> Option<Obstacle> {
        let opponent = snapshot.opponent();
        if opponent.age_us.is_none() {
            // Never observed: nothing known to evade
            return None;
        }

        let eps = if opponent.stale {
            self.config.safety_epsilon_m * self.config.stale_margin_scale
        } else {
            self.config.safety_epsilon_m
        };
        let opp = opponent.predictive_body();

        let mut own = snapshot.own_mallet().body;
        own.radius += eps;
        own.velocity = normalize_or_zero(goal - start) * cruise.max_speed_mps;

        let travel = (goal - start).norm() / cruise.max_speed_mps;
        let t = time_to_collision(&own, &opp)?;
        if t > self.config.collision_lookahead_s.min(travel) {
            return None;
        }
        Some(Obstacle {
            center: opp.projected_position(t),
            clearance: snapshot.own_mallet().body.radius + opp.radius + eps,
        })
    }

    /// Best valid waypoint on either side of the obstacle.
    fn evasive_waypoint(
        &self,
        snapshot: &WorldSnapshot,
        envelope: &Rect,
        start: Vec2,
        goal: Vec2,
        obstacle: &Obstacle,
    ) -> Option<Vec2> {
        let u = normalize_or_zero(goal - start);
        let n = perpendicular(u);
        let c = obstacle.clearance;

        let tangent_offset = |from: Vec2| {
            let d = (from - obstacle.center).dot(&u).abs();
            if d > c + GEOMETRY_EPSILON {
                c * d / (d * d - c * c).sqrt()
            } else {
                self.config.max_evasion_offset_m
            }
        };
        let base = tangent_offset(start).max(tangent_offset(goal)).max(c);

        let candidates = [1.0f32, -1.0].into_iter().filter_map(|side| {
            let cap = self.config.max_evasion_offset_m.max(c);
            let mut h = base.min(cap);
            for _ in 0..OFFSET_ATTEMPTS {
                let w = envelope.clamp(obstacle.center + n * (side * h));
                let valid = (w - obstacle.center).norm() >= c - CLEARANCE_TOLERANCE_M
                    && obstacle.clears(&Segment::new(start, w))
                    && obstacle.clears(&Segment::new(w, goal));
                if valid {
                    return Some(w);
                }
                if h >= cap {
                    break;
                }
                h = (h * OFFSET_GROWTH).min(cap);
            }
            None
        });

        let own_goal = snapshot.table.own_goal_center();
        let cost = |w: &Vec2| (w - start).norm() + (goal - w).norm();
        candidates.fold(None, |best: Option<Vec2>, w| match best {
            None => Some(w),
            Some(b) => {
                let (cw, cb) = (cost(&w), cost(&b));
                if (cw - cb).abs() <= self.config.tie_tolerance_m {
                    // Tie: defensive bias toward the controlled goal
                    if (w - own_goal).norm() < (b - own_goal).norm() {
                        Some(w)
                    } else {
                        Some(b)
                    }
                } else if cw < cb {
                    Some(w)
                } else {
                    Some(b)
                }
            }
        })
    }

    /// Last point on the direct line that keeps clearance from the obstacle.
    fn stop_short(&self, envelope: &Rect, start: Vec2, goal: Vec2, obstacle: &Obstacle) -> Vec2 {
        let u = normalize_or_zero(goal - start);
        let f = start - obstacle.center;
        let c = obstacle.clearance;
        // |f + u·s| = c  →  s² + 2(f·u)s + |f|² − c² = 0
        let b = f.dot(&u);
        let disc = b * b - (f.norm_squared() - c * c);
        let s = if disc < 0.0 { (goal - start).norm() } else { (-b - disc.sqrt()).max(0.0) };
        envelope.clamp(start + u * s.min((goal - start).norm()))
    }

    /// Attach rest-to-rest arrival times and pass-through velocities.
    fn timed(&self, start: Vec2, route: &[Vec2], cruise: &MotionLimits) -> Trajectory {
        let total: f32 = std::iter::once(start)
            .chain(route.iter().copied())
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| (w[1] - w[0]).norm())
            .sum();

        let mut travelled = 0.0f32;
        let mut prev = start;
        let last = route.len().saturating_sub(1);
        let waypoints = route.iter().enumerate().map(|(i, &p)| {
            travelled += (p - prev).norm();
            prev = p;
            let waypoint = Waypoint::at(p).with_arrival(profile_time(travelled, total, cruise));
            if i == last {
                waypoint.with_velocity(Vec2::zeros())
            } else {
                let out = normalize_or_zero(route[i + 1] - p);
                waypoint.with_velocity(out * profile_speed(travelled, total, cruise))
            }
        });
        Trajectory::new(start, waypoints.collect::<Vec<_>>())
    }
}

/// Time to cover `s` of a rest-to-rest move of length `total`.
fn profile_time(s: f32, total: f32, limits: &MotionLimits) -> f32 {
    let v = limits.max_speed_mps;
    let a = limits.max_accel_mps2;
    let s = s.clamp(0.0, total);
    let ramp = v * v / (2.0 * a);
    let duration = limits.travel_time(total);
    if total >= 2.0 * ramp {
        if s <= ramp {
            (2.0 * s / a).sqrt()
        } else if s <= total - ramp {
            v / a + (s - ramp) / v
        } else {
            duration - (2.0 * (total - s) / a).sqrt()
        }
    } else if s <= total / 2.0 {
        (2.0 * s / a).sqrt()
    } else {
        duration - (2.0 * (total - s) / a).sqrt()
    }
}

/// Profile speed at arc length `s`.
fn profile_speed(s: f32, total: f32, limits: &MotionLimits) -> f32 {
    let a = limits.max_accel_mps2;
    let s = s.clamp(0.0, total);
    let from_start = (2.0 * a * s).sqrt();
    let to_end = (2.0 * a * (total - s)).sqrt();
    from_start.min(to_end).min(limits.max_speed_mps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::EngineConfig;
    use crate::engine::types::{BodyId, Observation};
    use crate::engine::world_model::WorldModel;

    fn world(own: Vec2, opponent: Vec2) -> WorldSnapshot {
        let world = WorldModel::from_config(&EngineConfig::default());
        world.ingest(Observation::at(BodyId::OwnMallet, own, 1_000));
        world.ingest(Observation::at(BodyId::OpponentMallet, opponent, 1_000));
        world.ingest(Observation::at(BodyId::Puck, Vec2::new(1.0, 0.3), 1_000));
        world.snapshot(1_000)
    }

    fn planner(own_half_only: bool) -> PathPlanner {
        let cfg = EngineConfig::default();
        let mut planner_cfg = cfg.planner.clone();
        planner_cfg.own_half_only = own_half_only;
        PathPlanner::new(cfg.limits, planner_cfg)
    }

    #[test]
    fn test_direct_path_when_clear() {
        let snap = world(Vec2::new(2.2, 0.65), Vec2::new(0.3, 0.65));
        let plan = planner(true).plan_intent(&snap, &Intent::new(Vec2::new(1.8, 0.4), 1.0));
        assert_eq!(plan.kind, PlanKind::Direct);
        let t = &plan.trajectory;
        assert_eq!(t.waypoints().len(), 2);
        assert_eq!(t.start(), Vec2::new(2.2, 0.65));
        assert_eq!(t.goal().velocity, Some(Vec2::zeros()));
        assert!(t.duration().unwrap() > 0.0);
    }

    #[test]
    fn test_target_clamped_to_envelope() {
        let snap = world(Vec2::new(2.2, 0.65), Vec2::new(0.3, 0.65));
        let plan = planner(true).plan_intent(&snap, &Intent::new(Vec2::new(0.5, 5.0), 1.0));
        assert!(plan.target_clamped);
        let goal = plan.trajectory.goal().position;
        assert!(goal.x >= snap.table.midline_x() + 0.07 - 1e-6);
        assert!((goal.y - (snap.table.height - 0.07)).abs() < 1e-6);
    }

    #[test]
    fn test_hold_at_target() {
        let snap = world(Vec2::new(2.2, 0.65), Vec2::new(0.3, 0.65));
        let t = planner(true).plan(&snap, Vec2::new(2.2, 0.65));
        assert!(t.is_hold());
    }

    #[test]
    fn test_single_evasive_waypoint_clears_opponent() {
        let snap = world(Vec2::new(2.2, 0.65), Vec2::new(1.6, 0.65));
        let plan = planner(false).plan_intent(&snap, &Intent::new(Vec2::new(1.0, 0.65), 1.0));
        assert_eq!(plan.kind, PlanKind::Evasive);
        assert_eq!(plan.trajectory.waypoints().len(), 3);

        let evasive = plan.trajectory.evasive_waypoint().unwrap().position;
        let clearance = 0.07 + 0.07 + EngineConfig::default().planner.safety_epsilon_m;
        assert!((evasive - Vec2::new(1.6, 0.65)).norm() >= clearance - 1e-5);
        assert!(plan.trajectory.is_monotonic());
    }

    #[test]
    fn test_tie_prefers_own_goal_side() {
        // Vertical move with the opponent dead centre: both sides cost the same
        let snap = world(Vec2::new(2.0, 1.1), Vec2::new(2.0, 0.65));
        let plan = planner(true).plan_intent(&snap, &Intent::new(Vec2::new(2.0, 0.2), 1.0));
        assert_eq!(plan.kind, PlanKind::Evasive);
        let evasive = plan.trajectory.evasive_waypoint().unwrap().position;
        assert!(evasive.x > 2.0);
    }

    #[test]
    fn test_stale_opponent_gets_wider_berth() {
        let world = WorldModel::from_config(&EngineConfig::default());
        world.ingest(Observation::at(BodyId::OpponentMallet, Vec2::new(1.6, 0.65), 0)
            .with_velocity(Vec2::new(0.0, 2.0)));
        world.ingest(Observation::at(BodyId::OwnMallet, Vec2::new(2.2, 0.65), 500_000));
        let snap = world.snapshot(500_000);
        assert!(snap.opponent().stale);

        let cfg = EngineConfig::default();
        let plan = planner(false).plan_intent(&snap, &Intent::new(Vec2::new(1.0, 0.65), 1.0));
        assert_eq!(plan.kind, PlanKind::Evasive);
        let evasive = plan.trajectory.evasive_waypoint().unwrap().position;
        let clearance = 0.14 + cfg.planner.safety_epsilon_m * cfg.planner.stale_margin_scale;
        // Evaded around the last known position, not a velocity projection
        assert!((evasive - Vec2::new(1.6, 0.65)).norm() >= clearance - 1e-5);
    }

    #[test]
    fn test_stop_short_when_boxed_in() {
        let cfg = EngineConfig::default();
        let mut planner_cfg = cfg.planner.clone();
        planner_cfg.own_half_only = false;
        planner_cfg.max_evasion_offset_m = 0.16;
        let planner = PathPlanner::new(cfg.limits, planner_cfg);
        // Opponent pinned against the top wall between us and a target hugging the wall
        let snap = world(Vec2::new(2.2, 1.23), Vec2::new(1.6, 1.23));
        let plan = planner.plan_intent(&snap, &Intent::new(Vec2::new(1.0, 1.23), 1.0));
        assert_eq!(plan.kind, PlanKind::StopShort);
        assert_eq!(plan.trajectory.waypoints().len(), 2);
        let stop = plan.trajectory.goal().position;
        assert!((stop - Vec2::new(1.6, 1.23)).norm() >= 0.16 - 1e-4);
        assert!(stop.x > 1.6);
    }

    #[test]
    fn test_low_urgency_is_slower() {
        let snap = world(Vec2::new(2.2, 0.65), Vec2::new(0.3, 0.65));
        let p = planner(true);
        let fast = p.plan_intent(&snap, &Intent::new(Vec2::new(1.5, 0.3), 1.0));
        let slow = p.plan_intent(&snap, &Intent::new(Vec2::new(1.5, 0.3), 0.0));
        assert!(slow.trajectory.duration().unwrap() > fast.trajectory.duration().unwrap());
    }

    #[test]
    fn test_profile_time_matches_travel_time() {
        let limits = MotionLimits { max_speed_mps: 2.0, max_accel_mps2: 10.0 };
        for total in [0.1f32, 0.4, 1.0] {
            assert!((profile_time(total, total, &limits) - limits.travel_time(total)).abs() < 1e-5);
            assert!(profile_time(total / 3.0, total, &limits) < profile_time(total / 2.0, total, &limits));
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Waypoints always stay inside the mallet collision frame
            #[test]
            fn prop_waypoints_within_frame(
                ox in 1.3f32..2.43, oy in 0.07f32..1.23,
                px in 0.07f32..2.43, py in 0.07f32..1.23,
                tx in -1.0f32..4.0, ty in -1.0f32..2.5,
                urgency in 0.0f32..1.0,
                own_half in any::<bool>(),
            ) {
                let snap = world(Vec2::new(ox, oy), Vec2::new(px, py));
                let plan = planner(own_half).plan_intent(&snap, &Intent::new(Vec2::new(tx, ty), urgency));
                let frame = snap.table.collision_frame(0.07);
                prop_assert!(plan.trajectory.waypoints().len() <= 3);
                prop_assert!(plan.trajectory.within_frame(&frame));
                prop_assert!(plan.trajectory.is_monotonic());
            }
        }
    }
}
