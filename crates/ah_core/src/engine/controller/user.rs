use std::sync::{Arc, Mutex};

use super::{Controller, ControllerKind, MalletState};
use crate::engine::config::MotionLimits;
use crate::engine::geometry::Rect;
use crate::engine::steering::limited_step;
use crate::engine::trajectory::Trajectory;
use crate::engine::types::Vec2;
use crate::error::ActuatorError;

/// Latest user-supplied mallet position, shared between the input source
/// and the controller.
#[derive(Debug, Clone, Default)]
pub struct UserInputHandle {
    latest: Arc<Mutex<Option<Vec2>>>,
}

impl UserInputHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, position: Vec2) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(position);
    }

    pub fn clear(&self) {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn latest(&self) -> Option<Vec2> {
        *self.latest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// The human moves the mallet; planned trajectories are ignored and the
/// controller only reports where the mallet went. Samples are clamped into
/// `frame`, the region the mallet centre may occupy.
#[derive(Debug)]
pub struct UserController {
    input: UserInputHandle,
    limits: MotionLimits,
    frame: Rect,
    state: Option<MalletState>,
}

impl UserController {
    pub fn new(input: UserInputHandle, limits: MotionLimits, frame: Rect) -> Self {
        Self { input, limits, frame, state: None }
    }

    /// Usable target for this tick; non-finite samples are ignored.
    fn target(&self, fallback: Vec2) -> Vec2 {
        self.input
            .latest()
            .filter(|p| p.iter().all(|c| c.is_finite()))
            .map_or(fallback, |p| self.frame.clamp(p))
    }
}

impl Controller for UserController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::UserInput
    }

    fn initialize(&mut self, start: MalletState) -> Result<(), ActuatorError> {
        self.state = Some(start);
        Ok(())
    }

    fn apply(&mut self, _trajectory: &Trajectory, dt: f32) -> Result<MalletState, ActuatorError> {
        let prev = self.state.ok_or(ActuatorError::NotInitialized)?;
        let target = self.target(prev.position);
        let mut next = limited_step(&prev, target, &self.limits, dt);
        let railed = self.frame.clamp(next.position);
        if railed != next.position && dt > 0.0 {
            // The rail stops the mallet
            next = MalletState { position: railed, velocity: (railed - prev.position) / dt };
        }
        self.state = Some(next);
        Ok(next)
    }

    fn report_state(&self) -> MalletState {
        self.state.unwrap_or_else(|| MalletState::at_rest(Vec2::zeros()))
    }

    fn shutdown(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::table::Table;

    fn frame() -> Rect {
        Table::default().collision_frame(0.07)
    }

    #[test]
    fn test_follows_user_sample_within_limits() {
        let input = UserInputHandle::new();
        let limits = MotionLimits { max_speed_mps: 3.0, max_accel_mps2: 30.0 };
        let mut c = UserController::new(input.clone(), limits, frame());
        c.initialize(MalletState::at_rest(Vec2::new(2.2, 0.65))).unwrap();

        // Trajectory is ignored
        let planned = Trajectory::hold(Vec2::new(1.0, 1.0));
        input.set(Vec2::new(2.2005, 0.65));
        let s = c.apply(&planned, 0.01).unwrap();
        assert!((s.position - Vec2::new(2.2005, 0.65)).norm() < 1e-6);

        // A jump is limited
        input.set(Vec2::new(1.2, 0.65));
        let s = c.apply(&planned, 0.01).unwrap();
        assert!(s.position.x > 2.1);
    }

    #[test]
    fn test_no_sample_holds() {
        let mut c = UserController::new(UserInputHandle::new(), MotionLimits::default(), frame());
        c.initialize(MalletState::at_rest(Vec2::new(2.0, 0.5))).unwrap();
        let s = c.apply(&Trajectory::hold(Vec2::zeros()), 0.01).unwrap();
        assert_eq!(s.position, Vec2::new(2.0, 0.5));
    }

    #[test]
    fn test_off_table_sample_is_clamped_to_frame() {
        let input = UserInputHandle::new();
        let mut c = UserController::new(input.clone(), MotionLimits::default(), frame());
        c.initialize(MalletState::at_rest(Vec2::new(2.2, 0.65))).unwrap();

        input.set(Vec2::new(3.0, -1.0));
        let mut s = c.report_state();
        for _ in 0..200 {
            s = c.apply(&Trajectory::hold(Vec2::zeros()), 0.016_667).unwrap();
            assert!(frame().contains(s.position), "left the table: {:?}", s.position);
        }
        assert!((s.position - Vec2::new(2.43, 0.07)).norm() < 1e-3);
    }

    #[test]
    fn test_non_finite_sample_is_ignored() {
        let input = UserInputHandle::new();
        let mut c = UserController::new(input.clone(), MotionLimits::default(), frame());
        c.initialize(MalletState::at_rest(Vec2::new(2.2, 0.65))).unwrap();

        input.set(Vec2::new(f32::NAN, 0.5));
        let s = c.apply(&Trajectory::hold(Vec2::zeros()), 0.016_667).unwrap();
        assert_eq!(s.position, Vec2::new(2.2, 0.65));

        input.set(Vec2::new(f32::INFINITY, 0.5));
        let s = c.apply(&Trajectory::hold(Vec2::zeros()), 0.016_667).unwrap();
        assert_eq!(s.position, Vec2::new(2.2, 0.65));

        input.set(Vec2::new(2.0, 0.5));
        for _ in 0..120 {
            c.apply(&Trajectory::hold(Vec2::zeros()), 0.016_667).unwrap();
        }
        let s = c.report_state();
        assert!(s.position.iter().all(|v| v.is_finite()));
        assert!((s.position - Vec2::new(2.0, 0.5)).norm() < 1e-3);
    }
}
