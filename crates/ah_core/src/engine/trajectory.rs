//! Planned mallet trajectory.

use serde::Serialize;
use tracing::warn;

use super::geometry::{Rect, Segment};
use super::types::Vec2;

/// Start, optional evasive waypoint, goal.
pub const MAX_WAYPOINTS: usize = 3;

/// Slack on the arrival-time ordering check (s)
const TIME_TOLERANCE: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub position: Vec2,
    /// Velocity the mallet should have when passing this point
    pub velocity: Option<Vec2>,
    /// Seconds after the start of the trajectory
    pub arrival_time: Option<f32>,
}

impl Waypoint {
    pub fn at(position: Vec2) -> Self {
        Self { position, velocity: None, arrival_time: None }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_arrival(mut self, time: f32) -> Self {
        self.arrival_time = Some(time);
        self
    }
}

/// Ordered waypoints beginning at the mallet's current position.
///
/// Never empty; `waypoints()[0]` is the start with arrival time zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    waypoints: Vec<Waypoint>,
}

impl Trajectory {
    /// Stay where the mallet is.
    pub fn hold(position: Vec2) -> Self {
        Self { waypoints: vec![Waypoint::at(position).with_arrival(0.0)] }
    }

    /// Trajectory from `start` through `rest`; excess waypoints are dropped.
    pub fn new(start: Vec2, rest: impl IntoIterator<Item = Waypoint>) -> Self {
        let mut waypoints = Vec::with_capacity(MAX_WAYPOINTS);
        waypoints.push(Waypoint::at(start).with_arrival(0.0));
        waypoints.extend(rest.into_iter().take(MAX_WAYPOINTS - 1));
        Self { waypoints }
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn start(&self) -> Vec2 {
        self.waypoints[0].position
    }

    /// First waypoint after the start; `None` for a hold.
    pub fn next_waypoint(&self) -> Option<&Waypoint> {
        self.waypoints.get(1)
    }

    /// Final waypoint (the start for a hold).
    pub fn goal(&self) -> &Waypoint {
        &self.waypoints[self.waypoints.len() - 1]
    }

    /// Intermediate waypoint inserted to avoid the opponent, if any.
    pub fn evasive_waypoint(&self) -> Option<&Waypoint> {
        (self.waypoints.len() == MAX_WAYPOINTS).then(|| &self.waypoints[1])
    }

    pub fn is_hold(&self) -> bool {
        self.waypoints.len() == 1
    }

    pub fn legs(&self) -> impl Iterator<Item = Segment> + '_ {
        self.waypoints.windows(2).map(|w| Segment::new(w[0].position, w[1].position))
    }

    pub fn total_length(&self) -> f32 {
        self.legs().map(|leg| leg.length()).sum()
    }

    pub fn duration(&self) -> Option<f32> {
        self.goal().arrival_time
    }

    /// Point at arc length `s` from the start, clamped to the goal.
    pub fn point_at_distance(&self, s: f32) -> Vec2 {
        let mut remaining = s.max(0.0);
        for leg in self.legs() {
            let len = leg.length();
            if remaining <= len && len > 0.0 {
                return leg.point_at(remaining / len);
            }
            remaining -= len;
        }
        self.goal().position
    }

    /// Arrival times, where present, never decrease along the sequence.
    pub fn is_monotonic(&self) -> bool {
        let times: Vec<f32> = self.waypoints.iter().filter_map(|w| w.arrival_time).collect();
        times.windows(2).all(|t| t[1] + TIME_TOLERANCE >= t[0])
    }

    /// Every waypoint after the start lies inside `frame`.
    ///
    /// The start is the measured mallet position and is not the planner's to move.
    pub fn within_frame(&self, frame: &Rect) -> bool {
        self.waypoints[1..].iter().all(|w| frame.contains(w.position))
    }

    /// Report a broken trajectory contract. Panics with `strict_contracts`.
    pub fn check_contract(&self, frame: &Rect) -> bool {
        let ok = self.within_frame(frame) && self.is_monotonic();
        if !ok {
            if cfg!(feature = "strict_contracts") {
                panic!("trajectory contract violated: {:?}", self.waypoints);
            }
            warn!(waypoints = self.waypoints.len(), "Planned trajectory violates its contract");
        }
        ok
    }
}
