//! Puck path projection.
//!
//! Straight-line motion with wall reflections, no friction. Used by the
//! strategy engine for threat detection and by the defensive variants to
//! find where the puck will cross their guard lines.

use serde::{Deserialize, Serialize};

use super::collision::{reflect_off_wall, time_to_wall_collision, Wall};
use super::geometry::{Segment, GEOMETRY_EPSILON};
use super::table::Table;
use super::types::{MovingBody, Vec2};

/// Which goal a projected path enters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalSide {
    /// The controlled goal at `x = width`
    Own,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalEntry {
    pub side: GoalSide,
    pub point: Vec2,
    /// Seconds from now
    pub time: f32,
}

/// One straight piece of the projected path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub start: Vec2,
    pub end: Vec2,
    pub t_start: f32,
    pub t_end: f32,
}

impl PathSegment {
    fn as_segment(&self) -> Segment {
        Segment::new(self.start, self.end)
    }

    /// Time at which the path passes `point`, assumed to lie on the segment.
    fn time_at(&self, point: Vec2) -> f32 {
        let t = self.as_segment().closest_param(point);
        self.t_start + (self.t_end - self.t_start) * t
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PuckPath {
    pub segments: Vec<PathSegment>,
    pub goal_entry: Option<GoalEntry>,
}

impl PuckPath {
    pub fn own_goal_entry(&self) -> Option<GoalEntry> {
        self.goal_entry.filter(|e| e.side == GoalSide::Own)
    }

    pub fn opponent_goal_entry(&self) -> Option<GoalEntry> {
        self.goal_entry.filter(|e| e.side == GoalSide::Opponent)
    }

    /// First point (and time) where the path crosses the vertical line `x = x_line`.
    pub fn line_crossing(&self, x_line: f32) -> Option<(Vec2, f32)> {
        self.segments.iter().find_map(|seg| {
            let (x0, x1) = (seg.start.x, seg.end.x);
            if (x0 - x_line) * (x1 - x_line) > 0.0 || (x1 - x0).abs() < GEOMETRY_EPSILON {
                return None;
            }
            let u = (x_line - x0) / (x1 - x0);
            let point = seg.start + (seg.end - seg.start) * u;
            Some((point, seg.t_start + (seg.t_end - seg.t_start) * u))
        })
    }

    /// Earliest intersection of the path with any of `lines`.
    pub fn first_intersection(&self, lines: &[Segment]) -> Option<(Vec2, f32)> {
        for seg in &self.segments {
            let path = seg.as_segment();
            let hit = lines
                .iter()
                .filter_map(|line| path.intersection(line))
                .map(|p| (p, seg.time_at(p)))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if hit.is_some() {
                return hit;
            }
        }
        None
    }

    pub fn end_point(&self) -> Option<Vec2> {
        self.segments.last().map(|s| s.end)
    }
}

/// Projects puck motion on a fixed table.
#[derive(Debug, Clone, Copy)]
pub struct PuckPredictor {
    pub table: Table,
    pub max_bounces: u32,
    pub wall_restitution: f32,
}

impl PuckPredictor {
    pub fn new(table: Table, max_bounces: u32, wall_restitution: f32) -> Self {
        Self { table, max_bounces, wall_restitution }
    }

    /// Reflected straight-line path until `horizon` seconds, a goal mouth,
    /// or the bounce budget runs out.
    pub fn project(&self, puck: &MovingBody, horizon: f32) -> PuckPath {
        let mut path = PuckPath::default();
        let r = puck.radius;

        if self.table.is_in_own_goal(puck.position, r) {
            path.goal_entry = Some(GoalEntry { side: GoalSide::Own, point: puck.position, time: 0.0 });
            return path;
        }
        if self.table.is_in_opponent_goal(puck.position, r) {
            path.goal_entry =
                Some(GoalEntry { side: GoalSide::Opponent, point: puck.position, time: 0.0 });
            return path;
        }

        let mut body = *puck;
        let mut t = 0.0f32;
        let mut bounces = 0u32;

        while t < horizon && body.speed() > GEOMETRY_EPSILON {
            let remaining = horizon - t;
            let hit = time_to_wall_collision(&body, &self.table);
            let dt = hit.map_or(remaining, |h| h.time.min(remaining));
            let end = body.projected_position(dt);
            path.segments.push(PathSegment { start: body.position, end, t_start: t, t_end: t + dt });
            t += dt;
            body.position = end;

            let Some(hit) = hit.filter(|h| h.time <= remaining) else {
                break;
            };
            let side = match hit.wall {
                Wall::Right => Some(GoalSide::Own),
                Wall::Left => Some(GoalSide::Opponent),
                _ => None,
            };
            if let Some(side) = side.filter(|_| self.table.is_in_goal_y(end.y)) {
                path.goal_entry = Some(GoalEntry { side, point: end, time: t });
                break;
            }
            if bounces >= self.max_bounces {
                break;
            }
            bounces += 1;
            body.velocity = reflect_off_wall(body.velocity, hit.wall, self.wall_restitution);
        }
        path
    }

    pub fn goal_entry(&self, puck: &MovingBody, horizon: f32) -> Option<GoalEntry> {
        self.project(puck, horizon).own_goal_entry()
    }

    pub fn opponent_goal_entry(&self, puck: &MovingBody, horizon: f32) -> Option<GoalEntry> {
        self.project(puck, horizon).opponent_goal_entry()
    }

    pub fn line_crossing(&self, puck: &MovingBody, horizon: f32, x_line: f32) -> Option<(Vec2, f32)> {
        self.project(puck, horizon).line_crossing(x_line)
    }
}
